//! Pascal VOC XML reader and writer.
//!
//! One XML file per image, stored under an `Annotations/` directory and named
//! after the image's basename. Two VOC extensions are written and read back:
//! `<path>` carries the image key verbatim, and each `<object>` carries a
//! `<confidence>` element with the annotation score.
//!
//! Box corners are written as integers (truncated toward zero), so sub-pixel
//! detector coordinates do not survive a VOC round trip.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::io_coco_json::basename;
use super::model::{is_valid_score, Annotation, AnnotationSet, MANUAL_SCORE};
use super::probe::read_image_dimensions;
use super::report::IoReport;
use super::BBox;
use crate::error::PrelabelError;

/// Name of the per-image XML directory inside a VOC dataset root.
pub const ANNOTATIONS_DIR: &str = "Annotations";

const VOC_XML_EXTENSION: &str = "xml";
const IMAGE_DEPTH: u32 = 3;

/// Write an annotation set as a Pascal VOC directory.
///
/// Creates `Annotations/` under `path` with one `<basename>.xml` per image.
/// Images whose dimensions cannot be read are skipped and reported. Images
/// sharing a basename overwrite each other's XML file.
pub fn write_voc_dir(path: &Path, set: &AnnotationSet) -> Result<IoReport, PrelabelError> {
    write_voc_dir_with(path, set, read_image_dimensions)
}

/// Same as [`write_voc_dir`] but with a caller-supplied dimension lookup.
pub fn write_voc_dir_with<F>(
    path: &Path,
    set: &AnnotationSet,
    mut probe: F,
) -> Result<IoReport, PrelabelError>
where
    F: FnMut(&Path) -> Result<(u32, u32), PrelabelError>,
{
    let annotations_dir = path.join(ANNOTATIONS_DIR);
    fs::create_dir_all(&annotations_dir).map_err(PrelabelError::Io)?;

    let mut report = IoReport::new();
    for (image_key, annotations) in set.iter() {
        let (width, height) = match probe(Path::new(image_key)) {
            Ok(dims) => dims,
            Err(err) => {
                report.record_skip(image_key, err);
                continue;
            }
        };

        let xml_path = annotations_dir.join(xml_file_name(image_key));
        let xml = render_voc_xml(image_key, width, height, annotations).map_err(|_| {
            PrelabelError::VocWrite {
                path: xml_path.clone(),
                message: "failed to format XML".to_string(),
            }
        })?;

        fs::write(&xml_path, xml).map_err(PrelabelError::Io)?;
        report.record_processed();
    }

    log::info!(
        "saved PASCAL VOC annotations for {} image(s) to {}",
        report.processed,
        annotations_dir.display()
    );
    Ok(report)
}

/// Read a Pascal VOC directory into an annotation set.
///
/// `path` may be the dataset root containing `Annotations/`, or a directory
/// of XML files itself. Files that fail to parse are skipped with a
/// diagnostic; the scan never aborts part-way.
pub fn read_voc_dir(path: &Path) -> Result<(AnnotationSet, IoReport), PrelabelError> {
    let annotations_dir = discover_annotations_dir(path)?;
    let xml_files = collect_xml_files(&annotations_dir)?;

    let mut set = AnnotationSet::new();
    let mut report = IoReport::new();

    for xml_path in xml_files {
        let parsed = fs::read_to_string(&xml_path)
            .map_err(PrelabelError::Io)
            .and_then(|xml| parse_voc_xml_str(&xml, &xml_path));

        match parsed {
            Ok(parsed) => {
                if set.contains(&parsed.image_key) {
                    log::warn!(
                        "{} redefines image '{}'; keeping the later file",
                        xml_path.display(),
                        parsed.image_key
                    );
                }
                set.insert(parsed.image_key, parsed.annotations);
                report.record_processed();
            }
            Err(err) => report.record_skip(xml_path.display().to_string(), err),
        }
    }

    Ok((set, report))
}

/// Parse VOC XML from a UTF-8 string into `(image key, annotations)`.
pub fn from_voc_xml_str(xml: &str) -> Result<(String, Vec<Annotation>), PrelabelError> {
    let parsed = parse_voc_xml_str(xml, Path::new("<memory>"))?;
    Ok((parsed.image_key, parsed.annotations))
}

/// Parse VOC XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<(String, Vec<Annotation>), PrelabelError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| PrelabelError::VocXmlParse {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_voc_xml_str(xml)
}

/// XML file name for an image key: basename with an `.xml` extension.
pub fn xml_file_name(image_key: &str) -> String {
    let stem = Path::new(image_key)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| basename(image_key));
    format!("{stem}.{VOC_XML_EXTENSION}")
}

#[derive(Debug)]
struct ParsedVocAnnotation {
    image_key: String,
    annotations: Vec<Annotation>,
}

fn discover_annotations_dir(input: &Path) -> Result<PathBuf, PrelabelError> {
    if !input.is_dir() {
        return Err(PrelabelError::VocLayoutInvalid {
            path: input.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let nested = input.join(ANNOTATIONS_DIR);
    if nested.is_dir() {
        Ok(nested)
    } else {
        Ok(input.to_path_buf())
    }
}

fn collect_xml_files(dir: &Path) -> Result<Vec<PathBuf>, PrelabelError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).map_err(PrelabelError::Io)? {
        let entry = entry.map_err(PrelabelError::Io)?;
        let path = entry.path();
        if path.is_file() && has_xml_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<ParsedVocAnnotation, PrelabelError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| PrelabelError::VocXmlParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(PrelabelError::VocXmlParse {
            path: path.to_path_buf(),
            message: "missing <annotation> root element".to_string(),
        });
    }

    let image_key = match optional_child_text(annotation, "path") {
        Some(image_path) => image_path,
        None => {
            let filename = optional_child_text(annotation, "filename");
            let folder = optional_child_text(annotation, "folder");
            if filename.is_none() && folder.is_none() {
                return Err(PrelabelError::VocXmlParse {
                    path: path.to_path_buf(),
                    message: "missing <path>, <folder> and <filename> in <annotation>"
                        .to_string(),
                });
            }
            Path::new(&folder.unwrap_or_default())
                .join(filename.unwrap_or_default())
                .to_string_lossy()
                .into_owned()
        }
    };

    let mut annotations = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let label = required_child_text(object, "name", path, "<object>")?;
        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;

        let xmin = parse_corner(bndbox, "xmin", path)?;
        let ymin = parse_corner(bndbox, "ymin", path)?;
        let xmax = parse_corner(bndbox, "xmax", path)?;
        let ymax = parse_corner(bndbox, "ymax", path)?;

        let score = match optional_child_text(object, "confidence") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|score| is_valid_score(*score))
                .ok_or_else(|| PrelabelError::VocXmlParse {
                    path: path.to_path_buf(),
                    message: format!(
                        "invalid <confidence> value '{raw}'; expected a number in [0, 1]"
                    ),
                })?,
            None => MANUAL_SCORE,
        };

        annotations.push(Annotation {
            bbox: BBox::from_xyxy(xmin, ymin, xmax, ymax),
            label,
            score,
        });
    }

    Ok(ParsedVocAnnotation {
        image_key,
        annotations,
    })
}

/// Corner values are whole pixels; decimals from other tools are truncated.
fn parse_corner(bndbox: Node<'_, '_>, tag: &str, path: &Path) -> Result<f64, PrelabelError> {
    let raw = required_child_text(bndbox, tag, path, "<bndbox>")?;
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value as f64);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(f64::trunc)
        .ok_or_else(|| PrelabelError::VocXmlParse {
            path: path.to_path_buf(),
            message: format!("invalid <{tag}> value '{raw}' in <bndbox>; expected integer"),
        })
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, PrelabelError> {
    child_element(node, tag).ok_or_else(|| PrelabelError::VocXmlParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, PrelabelError> {
    optional_child_text(node, tag).ok_or_else(|| PrelabelError::VocXmlParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn render_voc_xml(
    image_key: &str,
    width: u32,
    height: u32,
    annotations: &[Annotation],
) -> Result<String, std::fmt::Error> {
    let folder = Path::new(image_key)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut xml = String::new();
    writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(xml, "<annotation>")?;
    writeln!(xml, "  <folder>{}</folder>", xml_escape(&folder))?;
    writeln!(
        xml,
        "  <filename>{}</filename>",
        xml_escape(&basename(image_key))
    )?;
    writeln!(xml, "  <path>{}</path>", xml_escape(image_key))?;
    writeln!(xml, "  <source>")?;
    writeln!(xml, "    <database>Unknown</database>")?;
    writeln!(xml, "  </source>")?;
    writeln!(xml, "  <size>")?;
    writeln!(xml, "    <width>{width}</width>")?;
    writeln!(xml, "    <height>{height}</height>")?;
    writeln!(xml, "    <depth>{IMAGE_DEPTH}</depth>")?;
    writeln!(xml, "  </size>")?;
    writeln!(xml, "  <segmented>0</segmented>")?;

    for annotation in annotations {
        let [xmin, ymin, xmax, ymax] = annotation.bbox.truncated();
        writeln!(xml, "  <object>")?;
        writeln!(xml, "    <name>{}</name>", xml_escape(&annotation.label))?;
        writeln!(xml, "    <pose>Unspecified</pose>")?;
        writeln!(xml, "    <truncated>0</truncated>")?;
        writeln!(xml, "    <difficult>0</difficult>")?;
        writeln!(xml, "    <bndbox>")?;
        writeln!(xml, "      <xmin>{xmin}</xmin>")?;
        writeln!(xml, "      <ymin>{ymin}</ymin>")?;
        writeln!(xml, "      <xmax>{xmax}</xmax>")?;
        writeln!(xml, "      <ymax>{ymax}</ymax>")?;
        writeln!(xml, "    </bndbox>")?;
        writeln!(xml, "    <confidence>{:?}</confidence>", annotation.score)?;
        writeln!(xml, "  </object>")?;
    }

    writeln!(xml, "</annotation>")?;
    Ok(xml)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}
