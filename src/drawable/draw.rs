// Draw traversal of the drawable tree

use super::{DrawableId, DrawableKind, DrawableTree, IgnoreAttributes};
use crate::document::TextAnchor;
use skia_safe::{
    canvas::SaveLayerRec, canvas::SrcRectConstraint, Canvas, ClipOp, Matrix, Picture,
    PictureRecorder, Rect,
};
use std::ops::ControlFlow;

/// Record drawing commands issued by `draw` into a picture bounded by `bounds`
pub fn record_picture(bounds: Rect, draw: impl FnOnce(&Canvas)) -> Option<Picture> {
    let mut recorder = PictureRecorder::new();
    let canvas = recorder.begin_recording(bounds, None);
    draw(canvas);
    recorder.finish_recording_as_picture(None)
}

impl DrawableTree {
    /// Draw `id` and its subtree. Reaching `until` stops the whole traversal
    /// before anything of `until` is drawn.
    pub fn draw(
        &self,
        canvas: &Canvas,
        id: DrawableId,
        ignore: IgnoreAttributes,
        until: Option<DrawableId>,
    ) -> ControlFlow<()> {
        if until == Some(id) {
            return ControlFlow::Break(());
        }
        let Some(drawable) = self.get(id) else {
            return ControlFlow::Continue(());
        };
        if !drawable.is_drawable {
            return ControlFlow::Continue(());
        }

        let antialias = drawable.is_antialias;
        canvas.save();
        if !ignore.contains(IgnoreAttributes::CLIP) {
            if let Some(overflow) = drawable.overflow {
                canvas.clip_rect(overflow, ClipOp::Intersect, antialias);
            }
        }
        canvas.concat(&drawable.transform);
        if !ignore.contains(IgnoreAttributes::CLIP) {
            if let Some(clip) = drawable.clip {
                canvas.clip_rect(clip, ClipOp::Intersect, antialias);
            }
        }
        if !ignore.contains(IgnoreAttributes::CLIP_PATH) {
            if let Some(clip_path) = &drawable.clip_path {
                canvas.clip_path(clip_path, ClipOp::Intersect, antialias);
            }
        }

        let mask = drawable.mask.as_ref().filter(|_| !ignore.contains(IgnoreAttributes::MASK));
        if let Some(mask) = mask {
            canvas.save_layer(&SaveLayerRec::default().bounds(&mask.region).paint(&mask.layer_paint));
        }
        let opacity = drawable.opacity.as_ref().filter(|_| !ignore.contains(IgnoreAttributes::OPACITY));
        if let Some(opacity) = opacity {
            canvas.save_layer(&SaveLayerRec::default().paint(opacity));
        }
        let filter = drawable.filter.as_ref().filter(|_| !ignore.contains(IgnoreAttributes::FILTER));
        if let Some(filter) = filter {
            canvas.save_layer(&SaveLayerRec::default().bounds(&filter.region).paint(&filter.paint));
        }

        let flow = self.draw_content(canvas, id, ignore, until);

        if filter.is_some() {
            canvas.restore();
        }
        if opacity.is_some() {
            canvas.restore();
        }
        if let Some(mask) = mask {
            canvas.save_layer(&SaveLayerRec::default().bounds(&mask.region).paint(&mask.dst_in_paint));
            let _ = self.draw(canvas, mask.drawable, ignore, None);
            canvas.restore();
            canvas.restore();
        }
        canvas.restore();
        flow
    }

    /// Draw what the drawable's kind draws, without transform, clips or layers
    pub(crate) fn draw_content(
        &self,
        canvas: &Canvas,
        id: DrawableId,
        ignore: IgnoreAttributes,
        until: Option<DrawableId>,
    ) -> ControlFlow<()> {
        let drawable = &self[id];
        match &drawable.kind {
            DrawableKind::Container { children, .. } => {
                for child in children {
                    self.draw(canvas, *child, ignore, until)?;
                }
            }
            DrawableKind::Shape { path, markers } => {
                if let Some(fill) = &drawable.fill {
                    canvas.draw_path(path, fill);
                }
                if let Some(stroke) = &drawable.stroke {
                    canvas.draw_path(path, stroke);
                }
                for marker in markers {
                    self.draw(canvas, *marker, ignore, until)?;
                }
            }
            DrawableKind::Image { image, src, dst } => {
                if let Some(paint) = &drawable.fill {
                    canvas.draw_image_rect(image, Some((src, SrcRectConstraint::Fast)), dst, paint);
                }
            }
            DrawableKind::Text { text, font, origin, anchor } => {
                let (advance, _) = font.measure_str(text, None);
                let x = match anchor {
                    TextAnchor::Start => origin.x,
                    TextAnchor::Middle => origin.x - advance / 2.0,
                    TextAnchor::End => origin.x - advance,
                };
                for paint in [&drawable.fill, &drawable.stroke].into_iter().flatten() {
                    canvas.draw_str(text, (x, origin.y), font, paint);
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Product of the transforms from the root down to and including `id`
    pub fn total_transform(&self, id: DrawableId) -> Matrix {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self[node].parent;
        }
        chain.iter().rev().fold(Matrix::new_identity(), |mut total, node| {
            total.pre_concat(&self[*node].transform);
            total
        })
    }

    /// Record `id` (with its own transform) into a picture clipped to `bounds`
    pub fn snapshot(&self, id: DrawableId, bounds: Rect) -> Option<Picture> {
        if !self.contains(id) {
            return None;
        }
        record_picture(bounds, |canvas| {
            canvas.clip_rect(bounds, ClipOp::Intersect, true);
            let _ = self.draw(canvas, id, IgnoreAttributes::empty(), None);
        })
    }

    /// Everything drawn before `id`, from the root, in the local coordinates of `id`
    pub fn record_background(&self, id: DrawableId, bounds: Rect) -> Option<Picture> {
        let root = self.root()?;
        let to_local = self.total_transform(id).invert()?;
        record_picture(bounds, |canvas| {
            canvas.concat(&to_local);
            let _ = self.draw(canvas, root, IgnoreAttributes::empty(), Some(id));
        })
    }
}
