// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `/cgi-bin/status.xml` normalizer.
//!
//! The oldest and most limited status document: no module addresses, no
//! network section, no feed or Trident data.

use roxmltree::{Document, Node};

use crate::error::ParseError;
use crate::extract::parse_number;
use crate::status::{ControllerStatus, DataSource, Meta, Outlet, Probe};

/// Normalizes an XML status document.
///
/// # Errors
///
/// Returns [`ParseError::Xml`] when the document is not well-formed. Missing
/// or empty elements are never an error.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::payload::xml::parse_status_xml;
///
/// let status = parse_status_xml(
///     r#"<status software="5.12" hardware="1.0">
///          <hostname>reef</hostname>
///          <probes><probe><name>Tmp</name><value> 25.4 </value></probe></probes>
///        </status>"#,
/// )?;
/// assert_eq!(status.meta.hostname.as_deref(), Some("reef"));
/// assert_eq!(status.probes["Tmp"].value, Some(25.4));
/// # Ok::<(), apex_fusion_lib::ParseError>(())
/// ```
pub fn parse_status_xml(text: &str) -> Result<ControllerStatus, ParseError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();

    let attr = |name: &str| root.attribute(name).and_then(non_blank);

    let mut status = ControllerStatus::new(DataSource::Xml);
    status.meta = Meta {
        software: attr("software"),
        hardware: attr("hardware"),
        hostname: child_text(root, "hostname"),
        serial: child_text(root, "serial"),
        timezone: child_text(root, "timezone"),
        date: child_text(root, "date"),
        ..Meta::new(DataSource::Xml)
    };

    for probe in entries(root, "probes", "probe") {
        let Some(name) = child_text(probe, "name") else {
            continue;
        };
        let value_raw = child_text(probe, "value");
        status.probes.insert(
            name.clone(),
            Probe {
                probe_type: child_text(probe, "type"),
                value: value_raw.as_deref().and_then(parse_number),
                value_raw,
                ..Probe::new(name)
            },
        );
    }

    status.outlets = entries(root, "outlets", "outlet")
        .filter_map(|outlet| {
            let name = child_text(outlet, "name")?;
            let device_id = child_text(outlet, "deviceID").unwrap_or_else(|| name.clone());
            Some(Outlet {
                output_id: child_text(outlet, "outputID"),
                state: child_text(outlet, "state"),
                ..Outlet::new(device_id, name)
            })
        })
        .collect();

    Ok(status)
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(tag))
}

/// Trimmed text of the first direct child named `tag`.
fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    children(node, tag).next()?.text().and_then(non_blank)
}

/// `<list><item/>...</list>` entries, across every `list` element.
fn entries<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    list: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    children(root, list).flat_map(move |l| children(l, item))
}
