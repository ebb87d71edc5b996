//! Page assembly: extract, split and merge
//!
//! Pages are moved directly under the root page tree node. Attributes they
//! inherited from intermediate nodes are copied onto the page first, so the
//! intermediate nodes can be pruned without changing how a page renders.

use crate::document::{inherited_attribute, root_pages_id, PdfDocument, INHERITABLE_KEYS};
use crate::error::PdfSuiteError;
use lopdf::{Document, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};

/// One output file of a split.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfDocument {
    /// New document holding exactly the given pages, in the given order.
    ///
    /// A page listed twice appears twice. Every index must exist.
    pub fn extract_pages(&self, indices: &[usize]) -> Result<PdfDocument, PdfSuiteError> {
        self.ensure_available()?;
        if indices.is_empty() {
            return Err(PdfSuiteError::OutOfRangeSelection);
        }
        let sources = indices
            .iter()
            .map(|&i| self.page_id(i))
            .collect::<Result<Vec<_>, _>>()?;

        let mut doc = self.doc.clone();
        let root = root_pages_id(&doc)?;

        let mut kids = Vec::with_capacity(sources.len());
        let mut used = HashSet::new();
        for source in sources {
            let page = flattened_page(&doc, source, root)?;
            let id = if used.insert(source) {
                doc.objects.insert(source, Object::Dictionary(page));
                source
            } else {
                doc.add_object(page)
            };
            kids.push(id);
        }

        update_page_tree(&mut doc, root, &kids)?;
        doc.prune_objects();
        tracing::debug!(pages = kids.len(), "Extracted pages");
        Ok(PdfDocument::from_document(doc))
    }

    /// One single-page document per page, named `page-N.pdf` (1-based).
    pub fn split_all(&self) -> Result<Vec<NamedDocument>, PdfSuiteError> {
        let mut parts = Vec::with_capacity(self.page_ids.len());
        for index in 0..self.page_ids.len() {
            let mut part = self.extract_pages(&[index])?;
            parts.push(NamedDocument {
                name: format!("page-{}.pdf", index + 1),
                bytes: part.save()?,
            });
        }
        Ok(parts)
    }
}

/// Concatenate the pages of several documents, in order.
///
/// Object ids of each later document are shifted past the ids already in
/// use, then its pages are appended to the first document's page tree.
pub fn merge_documents(documents: Vec<PdfDocument>) -> Result<PdfDocument, PdfSuiteError> {
    let mut documents = documents.into_iter();
    let Some(first) = documents.next() else {
        return Err(PdfSuiteError::OperationError(
            "No documents to merge".into(),
        ));
    };
    first.ensure_available()?;

    let mut dest = first.doc;
    let root = root_pages_id(&dest)?;
    let mut kids = first.page_ids;
    let mut dest_max_id = dest.max_id;
    let mut merged = 1;

    for source in documents {
        source.ensure_available()?;
        let id_offset = dest_max_id;
        let mut source_doc = source.doc;

        // Bake inherited attributes in while the source tree is still intact
        let mut flattened = BTreeMap::new();
        for &page_id in &source.page_ids {
            flattened.insert(page_id, flattened_page(&source_doc, page_id, root)?);
        }
        for (page_id, page) in flattened {
            source_doc.objects.insert(page_id, Object::Dictionary(page));
        }

        for (old_id, object) in source_doc.objects {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset, root));
        }
        kids.extend(
            source
                .page_ids
                .iter()
                .map(|&(num, gen)| (num + id_offset, gen)),
        );

        dest_max_id = (source_doc.max_id + id_offset).max(dest_max_id);
        merged += 1;
    }

    // Pages of the first document may also sit under intermediate nodes
    for &page_id in &kids {
        let page = flattened_page(&dest, page_id, root)?;
        dest.objects.insert(page_id, Object::Dictionary(page));
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, root, &kids)?;
    dest.prune_objects();
    tracing::info!(documents = merged, pages = kids.len(), "Merged documents");
    Ok(PdfDocument::from_document(dest))
}

/// Copy of the page dictionary with inherited attributes made explicit and `/Parent` set to `parent`.
fn flattened_page(
    doc: &Document,
    page_id: ObjectId,
    parent: ObjectId,
) -> Result<lopdf::Dictionary, PdfSuiteError> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    for key in INHERITABLE_KEYS {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                page.set(key.to_vec(), value.clone());
            }
        }
    }
    page.set("Parent", Object::Reference(parent));
    Ok(page)
}

/// Shift every reference by `offset`. References to the source's page tree
/// root are not needed afterwards; `/Parent` is pointed at `dest_root`.
fn remap_object_refs(obj: Object, offset: u32, dest_root: ObjectId) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset, dest_root))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(remap_dict(dict, offset, dest_root)),
        Object::Stream(mut stream) => {
            stream.dict = remap_dict(stream.dict, offset, dest_root);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(dict: lopdf::Dictionary, offset: u32, dest_root: ObjectId) -> lopdf::Dictionary {
    let is_page = matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Page");
    let mut out = lopdf::Dictionary::new();
    for (key, value) in dict.iter() {
        let value = if is_page && key.as_slice() == b"Parent" {
            Object::Reference(dest_root)
        } else {
            remap_object_refs(value.clone(), offset, dest_root)
        };
        out.set(key.clone(), value);
    }
    out
}

/// Point the root page tree node at exactly `kids`.
fn update_page_tree(
    doc: &mut Document,
    root: ObjectId,
    kids: &[ObjectId],
) -> Result<(), PdfSuiteError> {
    let pages = doc.get_dictionary_mut(root).map_err(|_| {
        PdfSuiteError::OperationError("Invalid pages dictionary".into())
    })?;
    pages.set(
        "Kids",
        kids.iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>(),
    );
    pages.set("Count", kids.len() as i64);
    Ok(())
}
