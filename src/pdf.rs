// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! PDF plumbing on top of `lopdf`: page splitting, text probing, stamping
//! and merging.
//!
//! Pages may inherit `Resources`, `MediaBox`, `CropBox` and `Rotate` from
//! their page tree. Any operation that moves or decorates a page first copies
//! those attributes onto the page itself.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Resource name of the processed marker form.
pub const STAMP_NAME: &str = "ReceiptStamp";

/// Distance of the marker origin from the top-right corner, in points.
const STAMP_INSET: f64 = 70.0;

/// Red, 70% opaque, 60pt bold "S".
const STAMP_CONTENT: &[u8] = b"/GS1 gs 1 0 0 rg BT /F1 60 Tf 0 0 Td (S) Tj ET";

const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Bound on page tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// A4 portrait, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 595.0, 842.0];

pub fn load(bytes: &[u8]) -> Result<Document, lopdf::Error> {
    Document::load_mem(bytes)
}

pub fn save(doc: &mut Document) -> Result<Vec<u8>, lopdf::Error> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Machine-readable text embedded in the document, empty when none or
/// when the document cannot be read.
pub fn embedded_text(bytes: &[u8]) -> String {
    let Ok(doc) = Document::load_mem(bytes) else {
        return String::new();
    };
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).unwrap_or_default()
}

/// Serializes page `page` (1-based) of `doc` as a standalone document.
pub fn extract_page(doc: &Document, page: u32) -> Result<Vec<u8>, lopdf::Error> {
    let mut single = doc.clone();
    let others: Vec<u32> = single
        .get_pages()
        .keys()
        .copied()
        .filter(|number| *number != page)
        .collect();
    single.delete_pages(&others);
    single.prune_objects();
    save(&mut single)
}

/// Marks every page of `doc` as processed.
///
/// Existing page content is wrapped in `q … Q` so the marker is drawn in
/// the default coordinate space regardless of what the page left on the
/// graphics state stack.
pub fn stamp(doc: &mut Document) -> Result<(), lopdf::Error> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), (-15).into(), 60.into(), 60.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "ExtGState" => dictionary! {
                    "GS1" => dictionary! { "Type" => "ExtGState", "ca" => Object::Real(0.7) },
                },
            },
        },
        STAMP_CONTENT.to_vec(),
    );
    let form_id = doc.add_object(form);

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        flatten_inherited(doc, page_id)?;
        let [_, _, urx, ury] = media_box(doc, page_id);
        doc.add_xobject(page_id, STAMP_NAME, form_id)?;

        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(
            Dictionary::new(),
            format!(
                "\nQ\nq 1 0 0 1 {:.2} {:.2} cm /{STAMP_NAME} Do Q\n",
                urx - STAMP_INSET,
                ury - STAMP_INSET
            )
            .into_bytes(),
        ));

        let mut contents = page_contents(doc, page_id);
        contents.insert(0, Object::Reference(open));
        contents.push(Object::Reference(close));
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?
            .set("Contents", contents);
    }
    Ok(())
}

/// Concatenates the pages of `documents`, in order, into one document.
pub fn merge(documents: Vec<Document>) -> Result<Document, lopdf::Error> {
    let mut merged = Document::with_version("1.5");
    let pages_id = merged.new_object_id();
    let mut next_id = pages_id.0 + 1;
    let mut kids = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(next_id);
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in &page_ids {
            flatten_inherited(&mut doc, *page_id)?;
        }
        next_id = doc
            .objects
            .keys()
            .map(|(id, _)| *id)
            .max()
            .map_or(next_id, |max| max + 1);
        merged.objects.extend(doc.objects);

        for page_id in page_ids {
            merged
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)?
                .set("Parent", pages_id);
            kids.push(Object::Reference(page_id));
        }
    }

    merged.max_id = next_id - 1;
    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    Ok(merged)
}

/// Raw content stream bytes of every page, in page order.
pub fn page_contents_bytes(doc: &Document) -> Vec<Vec<u8>> {
    doc.get_pages()
        .into_values()
        .map(|page_id| doc.get_page_content(page_id).unwrap_or_default())
        .collect()
}

fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), lopdf::Error> {
    let page = doc.get_dictionary(page_id)?;
    let missing: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter(|key| !page.has(key))
        .filter_map(|key| inherited(doc, page_id, key).map(|value| (*key, value)))
        .collect();

    let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
    for (key, value) in missing {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let resolved = match inherited(doc, page_id, b"MediaBox") {
        Some(Object::Reference(id)) => doc.get_object(id).ok().cloned(),
        other => other,
    };
    let Some(Object::Array(items)) = resolved else {
        return DEFAULT_MEDIA_BOX;
    };
    let numbers: Vec<f64> = items.iter().filter_map(number).collect();
    match numbers.as_slice() {
        [llx, lly, urx, ury] => [*llx, *lly, *urx, *ury],
        _ => DEFAULT_MEDIA_BOX,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Document, Object, Stream, dictionary};

    /// Builds a PDF with one Helvetica text line per page. Resources and
    /// MediaBox live on the page tree root so pages inherit them.
    pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
