// Scoped ownership of native Skia resources

use skia_safe::{ColorFilter, Image, ImageFilter, Paint, Path, PathEffect, Picture, Shader};

/// A native resource handed to a [`ResourceScope`]
#[derive(Clone)]
pub enum NativeResource {
    Paint(Paint),
    Path(Path),
    Shader(Shader),
    ColorFilter(ColorFilter),
    ImageFilter(ImageFilter),
    PathEffect(PathEffect),
    Picture(Picture),
    Image(Image),
}

macro_rules! native_resource_from {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeResource {
                fn from(value: $ty) -> Self {
                    NativeResource::$ty(value)
                }
            }
        )*
    };
}

native_resource_from!(Paint, Path, Shader, ColorFilter, ImageFilter, PathEffect, Picture, Image);

impl std::fmt::Debug for NativeResource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            NativeResource::Paint(_) => "Paint",
            NativeResource::Path(_) => "Path",
            NativeResource::Shader(_) => "Shader",
            NativeResource::ColorFilter(_) => "ColorFilter",
            NativeResource::ImageFilter(_) => "ImageFilter",
            NativeResource::PathEffect(_) => "PathEffect",
            NativeResource::Picture(_) => "Picture",
            NativeResource::Image(_) => "Image",
        };
        write!(f, "NativeResource::{}", name)
    }
}

/// Owns every native resource created while building one drawable. Resources are
/// released together, once, when the scope is disposed.
#[derive(Debug, Default)]
pub struct ResourceScope {
    resources: Vec<NativeResource>,
    released: usize,
    disposed: bool,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resource` and hand it back for use
    pub fn add<T>(&mut self, resource: T) -> T
    where
        T: Clone + Into<NativeResource>,
    {
        if self.disposed {
            tracing::warn!("resource registered into an already disposed scope");
        }
        self.resources.push(resource.clone().into());
        resource
    }

    /// Register an optional resource, passing `None` through
    pub fn add_opt<T>(&mut self, resource: Option<T>) -> Option<T>
    where
        T: Clone + Into<NativeResource>,
    {
        resource.map(|r| self.add(r))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release all resources in registration order. Returns how many were released
    /// by this call; disposing twice releases nothing the second time.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        let count = self.resources.len();
        for resource in self.resources.drain(..) {
            drop(resource);
        }
        self.released += count;
        count
    }

    /// Total number of resources this scope has released
    pub fn released(&self) -> usize {
        self.released
    }
}
