use prelabel::editor::{AnnotationEditor, Edge};
use prelabel::ir::Annotation;
use proptest::prelude::*;

mod proptest_helpers;

const WIDTH: u32 = 120;
const HEIGHT: u32 = 90;

fn editor_with(annotations: Vec<Annotation>) -> AnnotationEditor {
    let mut editor = AnnotationEditor::new("img.jpg", WIDTH, HEIGHT);
    editor.set_annotations(annotations);
    editor
}

fn arb_annotations() -> impl Strategy<Value = Vec<Annotation>> {
    proptest::collection::vec(proptest_helpers::arb_annotation_within(WIDTH, HEIGHT), 1..12)
}

/// Snaps corners outwards to whole pixels, the shape manual edits produce.
fn whole_pixels(mut annotation: Annotation) -> Annotation {
    let bbox = &mut annotation.bbox;
    bbox.x1 = bbox.x1.floor();
    bbox.y1 = bbox.y1.floor();
    bbox.x2 = bbox.x2.ceil();
    bbox.y2 = bbox.y2.ceil();
    annotation
}

fn arb_edge() -> impl Strategy<Value = Edge> {
    prop_oneof![
        Just(Edge::Top),
        Just(Edge::Bottom),
        Just(Edge::Left),
        Just(Edge::Right)
    ]
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn selection_has_minimal_area(
        annotations in arb_annotations(),
        x in 0.0f64..120.0,
        y in 0.0f64..90.0,
    ) {
        let mut editor = editor_with(annotations.clone());
        let selected = editor.select_annotation(x, y);

        let containing: Vec<(usize, f64)> = annotations
            .iter()
            .enumerate()
            .filter(|(_, ann)| ann.bbox.contains(x, y))
            .map(|(index, ann)| (index, ann.bbox.area()))
            .collect();

        match selected {
            None => prop_assert!(containing.is_empty()),
            Some(index) => {
                let area = annotations[index].bbox.area();
                prop_assert!(annotations[index].bbox.contains(x, y));
                for (other, other_area) in containing {
                    prop_assert!(area <= other_area);
                    if other_area == area {
                        prop_assert!(index <= other);
                    }
                }
            }
        }
    }

    #[test]
    fn resize_keeps_box_ordered_and_inside(
        annotations in arb_annotations(),
        index in 0usize..12,
        edge in arb_edge(),
        dx in -300.0f64..300.0,
        dy in -300.0f64..300.0,
    ) {
        let annotations: Vec<Annotation> = annotations.into_iter().map(whole_pixels).collect();
        let mut editor = editor_with(annotations.clone());
        let applied = editor.resize_annotation(index, edge, dx, dy);
        prop_assert_eq!(applied, index < annotations.len());

        if applied {
            let bbox = editor.get_annotations()[index].bbox;
            prop_assert!(bbox.x1 < bbox.x2, "{:?}", bbox);
            prop_assert!(bbox.y1 < bbox.y2, "{:?}", bbox);
            prop_assert!(bbox.x1 >= 0.0 && bbox.y1 >= 0.0);
            prop_assert!(bbox.x2 <= f64::from(WIDTH - 1));
            prop_assert!(bbox.y2 <= f64::from(HEIGHT - 1));
        } else {
            prop_assert_eq!(editor.get_annotations(), annotations.as_slice());
        }
    }

    #[test]
    fn move_keeps_every_coordinate_inside(
        annotations in arb_annotations(),
        index in 0usize..12,
        dx in -300.0f64..300.0,
        dy in -300.0f64..300.0,
    ) {
        let mut editor = editor_with(annotations.clone());
        if editor.move_annotation(index, dx, dy) {
            let bbox = editor.get_annotations()[index].bbox;
            for x in [bbox.x1, bbox.x2] {
                prop_assert!((0.0..=f64::from(WIDTH - 1)).contains(&x));
            }
            for y in [bbox.y1, bbox.y2] {
                prop_assert!((0.0..=f64::from(HEIGHT - 1)).contains(&y));
            }
        } else {
            prop_assert!(index >= annotations.len());
        }
    }

    #[test]
    fn delete_keeps_selection_on_the_same_annotation(
        annotations in arb_annotations(),
        selected in 0usize..12,
        deleted in 0usize..12,
    ) {
        let mut editor = editor_with(annotations.clone());
        let selected = editor.select_index(Some(selected));
        let before = editor.get_selected_annotation().cloned();

        let removed = editor.delete_annotation(deleted);
        prop_assert_eq!(removed, deleted < annotations.len());

        match (selected, removed) {
            (Some(sel), true) if sel == deleted => prop_assert_eq!(editor.selected_index(), None),
            _ => prop_assert_eq!(editor.get_selected_annotation().cloned(), before),
        }
    }
}
