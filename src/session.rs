//! Editing session over a whole annotation set.
//!
//! The session owns the set and at most one open [`AnnotationEditor`]. Opening
//! an image copies that image's slice into a fresh editor; committing writes
//! the edited slice back under the same key. Switching images commits the
//! previous editor first.

use std::path::Path;

use crate::editor::AnnotationEditor;
use crate::error::PrelabelError;
use crate::ir::{read_image_dimensions, Annotation, AnnotationSet};

#[derive(Debug, Default)]
pub struct AnnotationSession {
    annotations: AnnotationSet,
    editor: Option<AnnotationEditor>,
}

impl AnnotationSession {
    pub fn new(annotations: AnnotationSet) -> Self {
        Self {
            annotations,
            editor: None,
        }
    }

    /// Opens `image_key` for editing with known dimensions.
    ///
    /// Commits any editor that is already open. Images not yet in the set
    /// start with an empty list.
    pub fn open(&mut self, image_key: &str, width: u32, height: u32) -> &mut AnnotationEditor {
        self.commit();

        let mut editor = AnnotationEditor::new(image_key, width, height);
        editor.set_annotations(
            self.annotations
                .get(image_key)
                .map(<[Annotation]>::to_vec)
                .unwrap_or_default(),
        );
        self.editor.insert(editor)
    }

    /// Opens an image for editing, reading its dimensions from disk.
    pub fn open_file(&mut self, image_key: &str) -> Result<&mut AnnotationEditor, PrelabelError> {
        let (width, height) = read_image_dimensions(Path::new(image_key))?;
        Ok(self.open(image_key, width, height))
    }

    /// Replaces the open image's list wholesale (e.g., after running detection).
    pub fn replace_current(&mut self, annotations: Vec<Annotation>) -> bool {
        match self.editor.as_mut() {
            Some(editor) => {
                editor.set_annotations(annotations);
                true
            }
            None => false,
        }
    }

    pub fn editor(&self) -> Option<&AnnotationEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut AnnotationEditor> {
        self.editor.as_mut()
    }

    /// Writes the open editor's list back into the set and closes it.
    pub fn commit(&mut self) {
        if let Some(editor) = self.editor.take() {
            let key = editor.image_key().to_string();
            self.annotations.insert(key, editor.into_annotations());
        }
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    /// Commits and returns the whole set.
    pub fn into_annotations(mut self) -> AnnotationSet {
        self.commit();
        self.annotations
    }
}
