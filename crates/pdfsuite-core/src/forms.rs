//! AcroForm field extraction

use crate::error::PdfSuiteError;
use lopdf::{Dictionary, Document, Object};
use serde::{Deserialize, Serialize};

/// Ff bit 16: radio buttons rather than a checkbox.
const FLAG_RADIO: i64 = 1 << 15;
/// Ff bit 17: push button, carries no value.
const FLAG_PUSH_BUTTON: i64 = 1 << 16;
/// Ff bit 18: combo box rather than a list box.
const FLAG_COMBO: i64 = 1 << 17;

/// Guard against reference cycles in malformed field trees.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    Checkbox {
        name: String,
        checked: bool,
    },
    Radio {
        name: String,
        selected: Option<String>,
        options: Vec<String>,
    },
    Dropdown {
        name: String,
        selected: Vec<String>,
        options: Vec<String>,
    },
    #[serde(rename = "optionlist")]
    OptionList {
        name: String,
        selected: Vec<String>,
        options: Vec<String>,
    },
    /// Signature fields, push buttons and anything without a known type.
    Unknown {
        name: String,
    },
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Text { name, .. }
            | FormField::Checkbox { name, .. }
            | FormField::Radio { name, .. }
            | FormField::Dropdown { name, .. }
            | FormField::OptionList { name, .. }
            | FormField::Unknown { name } => name,
        }
    }
}

/// Inheritable attributes passed down the field tree.
#[derive(Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<Vec<u8>>,
    flags: i64,
}

/// Collect every terminal field of the document's interactive form.
///
/// A document without an `/AcroForm` has no fields.
pub fn extract_form_fields(doc: &Document) -> Result<Vec<FormField>, PdfSuiteError> {
    let catalog = doc.catalog()?;
    let Some(acroform) = catalog.get(b"AcroForm").ok().and_then(|o| as_dict(doc, o)) else {
        return Ok(Vec::new());
    };
    let Some(fields) = acroform.get(b"Fields").ok().and_then(|o| as_array(doc, o)) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for field in fields {
        if let Some(dict) = as_dict(doc, field) {
            walk_field(doc, dict, &Inherited::default(), 0, &mut out);
        }
    }
    tracing::debug!(count = out.len(), "Extracted form fields");
    Ok(out)
}

fn walk_field(
    doc: &Document,
    dict: &Dictionary,
    parent: &Inherited,
    depth: usize,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_DEPTH {
        tracing::warn!("Form field tree too deep, stopping");
        return;
    }

    let mut inherited = parent.clone();
    if let Some(partial) = dict.get(b"T").ok().and_then(text_string) {
        inherited.name = if parent.name.is_empty() {
            partial
        } else {
            format!("{}.{}", parent.name, partial)
        };
    }
    if let Ok(Object::Name(ft)) = dict.get(b"FT") {
        inherited.field_type = Some(ft.clone());
    }
    if let Some(flags) = dict.get(b"Ff").ok().and_then(as_int) {
        inherited.flags = flags;
    }

    // Kids carrying a /T are child fields; kids without one are widgets of this field.
    let kids: Vec<&Dictionary> = dict
        .get(b"Kids")
        .ok()
        .and_then(|o| as_array(doc, o))
        .map(|kids| kids.iter().filter_map(|k| as_dict(doc, k)).collect())
        .unwrap_or_default();
    let child_fields: Vec<&Dictionary> = kids.iter().copied().filter(|k| k.has(b"T")).collect();

    if !child_fields.is_empty() {
        for child in child_fields {
            walk_field(doc, child, &inherited, depth + 1, out);
        }
        return;
    }

    out.push(classify(doc, dict, &kids, &inherited));
}

fn classify(
    doc: &Document,
    dict: &Dictionary,
    widgets: &[&Dictionary],
    attrs: &Inherited,
) -> FormField {
    let name = attrs.name.clone();
    let value = dict.get(b"V").ok();

    match attrs.field_type.as_deref() {
        Some(b"Tx") => FormField::Text {
            name,
            value: value.and_then(text_string).unwrap_or_default(),
        },
        Some(b"Btn") if attrs.flags & FLAG_PUSH_BUTTON != 0 => FormField::Unknown { name },
        Some(b"Btn") if attrs.flags & FLAG_RADIO != 0 => {
            let mut options = Vec::new();
            for widget in widgets.iter().copied().chain(widgets.is_empty().then_some(dict)) {
                for state in appearance_states(doc, widget) {
                    if !options.contains(&state) {
                        options.push(state);
                    }
                }
            }
            FormField::Radio {
                name,
                selected: value.and_then(on_state),
                options,
            }
        }
        Some(b"Btn") => FormField::Checkbox {
            name,
            checked: value.and_then(on_state).is_some(),
        },
        Some(b"Ch") => {
            let options = dict
                .get(b"Opt")
                .ok()
                .and_then(|o| as_array(doc, o))
                .map(|opts| opts.iter().filter_map(|o| option_label(doc, o)).collect())
                .unwrap_or_default();
            let selected = match value {
                Some(Object::Array(items)) => items.iter().filter_map(text_string).collect(),
                Some(v) => text_string(v).into_iter().collect(),
                None => Vec::new(),
            };
            if attrs.flags & FLAG_COMBO != 0 {
                FormField::Dropdown {
                    name,
                    selected,
                    options,
                }
            } else {
                FormField::OptionList {
                    name,
                    selected,
                    options,
                }
            }
        }
        _ => FormField::Unknown { name },
    }
}

/// Names of a widget's normal "on" appearances.
fn appearance_states(doc: &Document, widget: &Dictionary) -> Vec<String> {
    widget
        .get(b"AP")
        .ok()
        .and_then(|o| as_dict(doc, o))
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|o| as_dict(doc, o))
        .map(|normal| {
            normal
                .iter()
                .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
                .filter(|k| k != "Off")
                .collect()
        })
        .unwrap_or_default()
}

/// A button value is a name; `/Off` means unset.
fn on_state(value: &Object) -> Option<String> {
    match value {
        Object::Name(n) if n.as_slice() != b"Off" => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// `/Opt` entries are either a display string or an `[export display]` pair.
fn option_label(doc: &Document, option: &Object) -> Option<String> {
    match option {
        Object::Array(pair) => pair.get(1).or_else(|| pair.first()).and_then(text_string),
        Object::Reference(_) => as_array(doc, option)
            .and_then(|pair| pair.get(1).or_else(|| pair.first()))
            .and_then(text_string),
        other => text_string(other),
    }
}

fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        },
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

fn as_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match obj {
        Object::Array(a) => Some(a),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(a) => Some(a),
            _ => None,
        },
        _ => None,
    }
}

fn as_int(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise Latin-1.
pub(crate) fn text_string(obj: &Object) -> Option<String> {
    let bytes = match obj {
        Object::String(bytes, _) => bytes,
        Object::Name(name) => return Some(String::from_utf8_lossy(name).into_owned()),
        _ => return None,
    };
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        Some(String::from_utf16_lossy(&units))
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};
    use pretty_assertions::assert_eq;

    fn literal(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    fn doc_with_fields(fields: Vec<Dictionary>) -> Document {
        let mut doc = Document::with_version("1.7");
        let field_refs: Vec<Object> = fields
            .into_iter()
            .map(|f| Object::Reference(doc.add_object(f)))
            .collect();
        let acroform = doc.add_object(dictionary! { "Fields" => field_refs });
        let pages = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages,
            "AcroForm" => acroform,
        });
        doc.trailer.set("Root", catalog);
        doc
    }

    #[test]
    fn test_no_acroform_means_no_fields() {
        let mut doc = Document::with_version("1.7");
        let pages = doc.add_object(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 });
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages });
        doc.trailer.set("Root", catalog);
        assert_eq!(extract_form_fields(&doc).unwrap(), vec![]);
    }

    #[test]
    fn test_text_and_checkbox() {
        let doc = doc_with_fields(vec![
            dictionary! { "FT" => "Tx", "T" => literal("name"), "V" => literal("Ada") },
            dictionary! { "FT" => "Btn", "T" => literal("agree"), "V" => "Yes" },
            dictionary! { "FT" => "Btn", "T" => literal("spam"), "V" => "Off" },
        ]);
        assert_eq!(
            extract_form_fields(&doc).unwrap(),
            vec![
                FormField::Text {
                    name: "name".into(),
                    value: "Ada".into()
                },
                FormField::Checkbox {
                    name: "agree".into(),
                    checked: true
                },
                FormField::Checkbox {
                    name: "spam".into(),
                    checked: false
                },
            ]
        );
    }

    #[test]
    fn test_radio_group_options_from_widgets() {
        let widget = |state: &str| {
            dictionary! {
                "Subtype" => "Widget",
                "AP" => dictionary! { "N" => dictionary! { state => Object::Null, "Off" => Object::Null } },
            }
        };
        let doc = doc_with_fields(vec![dictionary! {
            "FT" => "Btn",
            "Ff" => FLAG_RADIO,
            "T" => literal("size"),
            "V" => "M",
            "Kids" => vec![Object::Dictionary(widget("S")), Object::Dictionary(widget("M"))],
        }]);
        assert_eq!(
            extract_form_fields(&doc).unwrap(),
            vec![FormField::Radio {
                name: "size".into(),
                selected: Some("M".into()),
                options: vec!["S".into(), "M".into()],
            }]
        );
    }

    #[test]
    fn test_choice_fields() {
        let doc = doc_with_fields(vec![
            dictionary! {
                "FT" => "Ch",
                "Ff" => FLAG_COMBO,
                "T" => literal("country"),
                "Opt" => vec![literal("NZ"), literal("AU")],
                "V" => literal("AU"),
            },
            dictionary! {
                "FT" => "Ch",
                "T" => literal("toppings"),
                "Opt" => vec![
                    Object::Array(vec![literal("ch"), literal("Cheese")]),
                    Object::Array(vec![literal("ol"), literal("Olives")]),
                ],
                "V" => vec![literal("Cheese")],
            },
        ]);
        assert_eq!(
            extract_form_fields(&doc).unwrap(),
            vec![
                FormField::Dropdown {
                    name: "country".into(),
                    selected: vec!["AU".into()],
                    options: vec!["NZ".into(), "AU".into()],
                },
                FormField::OptionList {
                    name: "toppings".into(),
                    selected: vec!["Cheese".into()],
                    options: vec!["Cheese".into(), "Olives".into()],
                },
            ]
        );
    }

    #[test]
    fn test_hierarchical_names_and_inherited_type() {
        let doc = doc_with_fields(vec![dictionary! {
            "T" => literal("address"),
            "FT" => "Tx",
            "Kids" => vec![
                Object::Dictionary(dictionary! { "T" => literal("city"), "V" => literal("Oslo") }),
                Object::Dictionary(dictionary! { "T" => literal("zip") }),
            ],
        }]);
        assert_eq!(
            extract_form_fields(&doc).unwrap(),
            vec![
                FormField::Text {
                    name: "address.city".into(),
                    value: "Oslo".into()
                },
                FormField::Text {
                    name: "address.zip".into(),
                    value: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_push_button_and_signature_are_unknown() {
        let doc = doc_with_fields(vec![
            dictionary! { "FT" => "Btn", "Ff" => FLAG_PUSH_BUTTON, "T" => literal("submit") },
            dictionary! { "FT" => "Sig", "T" => literal("signature") },
        ]);
        let fields = extract_form_fields(&doc).unwrap();
        assert!(fields
            .iter()
            .all(|f| matches!(f, FormField::Unknown { .. })));
        assert_eq!(fields[1].name(), "signature");
    }

    #[test]
    fn test_utf16_names() {
        let obj = Object::String(vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0xE9], StringFormat::Hexadecimal);
        assert_eq!(text_string(&obj).unwrap(), "Hé");
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_value(FormField::OptionList {
            name: "a".into(),
            selected: vec![],
            options: vec![],
        })
        .unwrap();
        assert_eq!(json["type"], "optionlist");
    }
}
