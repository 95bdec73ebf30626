//! Textual edit commands for scripted editing.
//!
//! Syntax (one command per string):
//!
//! | Command | Effect |
//! |---------|--------|
//! | `add:X1,Y1,X2,Y2:LABEL` | append a manual box |
//! | `bbox:INDEX:X1,Y1,X2,Y2` | replace a box |
//! | `label:INDEX:LABEL` | relabel |
//! | `score:INDEX:SCORE` | change the score |
//! | `delete:INDEX` | remove |
//! | `move:INDEX:DX,DY` | translate with clamping |
//! | `resize:INDEX:EDGE:DX,DY` | move one edge with clamping |
//! | `select:X,Y` | hit-test selection |

use std::fmt;
use std::str::FromStr;

use super::{AnnotationEditor, AnnotationUpdate};
use crate::error::PrelabelError;
use crate::ir::BBox;

/// A single parsed edit command.
#[derive(Clone, Debug, PartialEq)]
pub enum EditOp {
    Add { bbox: BBox, label: String },
    SetBBox { index: usize, bbox: BBox },
    SetLabel { index: usize, label: String },
    SetScore { index: usize, score: f64 },
    Delete { index: usize },
    Move { index: usize, dx: f64, dy: f64 },
    Resize { index: usize, edge: String, dx: f64, dy: f64 },
    Select { x: f64, y: f64 },
}

/// What applying an [`EditOp`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    Added(usize),
    Applied,
    Selected(Option<usize>),
    /// The editor rejected the command (stale index, unknown edge).
    NoOp,
}

impl EditOp {
    pub fn apply(&self, editor: &mut AnnotationEditor) -> EditOutcome {
        let applied = match self {
            EditOp::Add { bbox, label } => {
                return EditOutcome::Added(editor.add_manual_annotation(*bbox, label.clone()))
            }
            EditOp::Select { x, y } => return EditOutcome::Selected(editor.select_annotation(*x, *y)),
            EditOp::SetBBox { index, bbox } => {
                editor.update_annotation(*index, AnnotationUpdate::bbox(*bbox))
            }
            EditOp::SetLabel { index, label } => {
                editor.update_annotation(*index, AnnotationUpdate::label(label.clone()))
            }
            EditOp::SetScore { index, score } => {
                editor.update_annotation(*index, AnnotationUpdate::score(*score))
            }
            EditOp::Delete { index } => editor.delete_annotation(*index),
            EditOp::Move { index, dx, dy } => editor.move_annotation(*index, *dx, *dy),
            EditOp::Resize {
                index,
                edge,
                dx,
                dy,
            } => editor.resize_annotation_by_name(*index, edge, *dx, *dy),
        };

        if applied {
            EditOutcome::Applied
        } else {
            EditOutcome::NoOp
        }
    }
}

impl FromStr for EditOp {
    type Err = PrelabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PrelabelError::InvalidEditOp(format!("'{s}': {reason}"));
        let (command, rest) = s.split_once(':').unwrap_or((s, ""));

        match command {
            "add" => {
                let (corners, label) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected add:X1,Y1,X2,Y2:LABEL"))?;
                if label.trim().is_empty() {
                    return Err(invalid("label must not be empty"));
                }
                Ok(EditOp::Add {
                    bbox: parse_corners(corners).ok_or_else(|| invalid("bad box corners"))?,
                    label: label.to_string(),
                })
            }
            "bbox" => {
                let (index, corners) = split_index(rest).ok_or_else(|| invalid("bad index"))?;
                Ok(EditOp::SetBBox {
                    index,
                    bbox: parse_corners(corners).ok_or_else(|| invalid("bad box corners"))?,
                })
            }
            "label" => {
                let (index, label) = split_index(rest).ok_or_else(|| invalid("bad index"))?;
                if label.trim().is_empty() {
                    return Err(invalid("label must not be empty"));
                }
                Ok(EditOp::SetLabel {
                    index,
                    label: label.to_string(),
                })
            }
            "score" => {
                let (index, score) = split_index(rest).ok_or_else(|| invalid("bad index"))?;
                let score = score
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| (0.0..=1.0).contains(v))
                    .ok_or_else(|| invalid("score must be a number in [0, 1]"))?;
                Ok(EditOp::SetScore { index, score })
            }
            "delete" => Ok(EditOp::Delete {
                index: rest.trim().parse().map_err(|_| invalid("bad index"))?,
            }),
            "move" => {
                let (index, delta) = split_index(rest).ok_or_else(|| invalid("bad index"))?;
                let [dx, dy] = parse_numbers(delta).ok_or_else(|| invalid("expected DX,DY"))?;
                Ok(EditOp::Move { index, dx, dy })
            }
            "resize" => {
                let (index, rest) = split_index(rest).ok_or_else(|| invalid("bad index"))?;
                let (edge, delta) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected resize:INDEX:EDGE:DX,DY"))?;
                let [dx, dy] = parse_numbers(delta).ok_or_else(|| invalid("expected DX,DY"))?;
                Ok(EditOp::Resize {
                    index,
                    edge: edge.trim().to_string(),
                    dx,
                    dy,
                })
            }
            "select" => {
                let [x, y] = parse_numbers(rest).ok_or_else(|| invalid("expected X,Y"))?;
                Ok(EditOp::Select { x, y })
            }
            other => Err(invalid(&format!("unknown command '{other}'"))),
        }
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOutcome::Added(index) => write!(f, "added #{index}"),
            EditOutcome::Applied => f.write_str("applied"),
            EditOutcome::Selected(Some(index)) => write!(f, "selected #{index}"),
            EditOutcome::Selected(None) => f.write_str("nothing selected"),
            EditOutcome::NoOp => f.write_str("no-op"),
        }
    }
}

fn split_index(raw: &str) -> Option<(usize, &str)> {
    let (index, rest) = raw.split_once(':')?;
    Some((index.trim().parse().ok()?, rest))
}

fn parse_numbers<const N: usize>(raw: &str) -> Option<[f64; N]> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

fn parse_corners(raw: &str) -> Option<BBox> {
    parse_numbers::<4>(raw).map(BBox::from)
}
