//! Object Bundle Codec (C6): serialises the output of the quadruple
//! generator to a versioned binary, reads it back, and renders the
//! human-readable `.ovejota` text dump.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codegen::GeneratedProgram;
use crate::error::BundleError;
use crate::memory::ConstValue;
use crate::quad::Quadruple;
use crate::symtab::Scope;

/// Bumped whenever the wire shape of `ObjectBundle` changes.
pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleHeader {
    pub filename: String,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectBundle {
    pub header: BundleHeader,
    pub constants: Vec<(i32, ConstValue)>,
    pub scopes: Vec<Scope>,
    pub quads: Vec<Quadruple>,
}

impl ObjectBundle {
    #[must_use]
    pub fn from_generated(filename: &str, timestamp: &str, generated: &GeneratedProgram) -> Self {
        let mut constants: Vec<(i32, ConstValue)> =
            generated.constants.iter().map(|(vdir, value)| (vdir, value.clone())).collect();
        constants.sort_by_key(|(vdir, _)| *vdir);

        let mut scopes: Vec<Scope> = generated.symtab.scopes().values().cloned().collect();
        scopes.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            header: BundleHeader { filename: filename.to_string(), timestamp: timestamp.to_string(), version: BUNDLE_VERSION },
            constants,
            scopes,
            quads: generated.quads.clone(),
        }
    }
}

pub fn write_obj(bundle: &ObjectBundle, writer: &mut impl Write) -> Result<(), BundleError> {
    bincode::serialize_into(writer, bundle)?;
    Ok(())
}

pub fn read_obj(reader: &mut impl Read) -> Result<ObjectBundle, BundleError> {
    let bundle: ObjectBundle = bincode::deserialize_from(reader)?;
    if bundle.header.version != BUNDLE_VERSION {
        return Err(BundleError::UnsupportedVersion { found: bundle.header.version, expected: BUNDLE_VERSION });
    }
    Ok(bundle)
}

/// Renders the constants table, function directory and one line per
/// quadruple, in the `idx op arg1 arg2 result [-> label]` shape.
#[must_use]
pub fn render_ovejota(bundle: &ObjectBundle) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "; {} compiled {} (bundle v{})\n",
        bundle.header.filename, bundle.header.timestamp, bundle.header.version
    ));

    out.push_str("; constants\n");
    for (vdir, value) in &bundle.constants {
        let rendered = match value {
            ConstValue::Int(n) => n.to_string(),
            ConstValue::Float(n) => format!("{n:?}"),
            ConstValue::Str(s) => format!("{s:?}"),
        };
        out.push_str(&format!(";   {vdir} = {rendered}\n"));
    }

    out.push_str("; functions\n");
    for scope in &bundle.scopes {
        if let Some(entry_quad) = scope.entry_quad {
            out.push_str(&format!(
                ";   {} entry={} params={:?} sizes={:?}\n",
                scope.name, entry_quad, scope.param_list, scope.segment_sizes
            ));
        }
    }

    out.push_str("; quads\n");
    for (idx, quad) in bundle.quads.iter().enumerate() {
        let arg1 = render_slot(quad.arg1);
        let arg2 = render_slot(quad.arg2);
        let result = render_slot(quad.result);
        let label = quad.label.as_deref().map(|l| format!(" -> {l}")).unwrap_or_default();
        out.push_str(&format!("{idx:>4}  {:?} {arg1} {arg2} {result}{label}\n", quad.op));
    }

    out
}

fn render_slot(slot: Option<i32>) -> String {
    slot.map_or_else(|| "_".to_string(), |v| v.to_string())
}

#[test]
fn bundle_round_trips_through_the_binary_codec() {
    let program = crate::parser::parse("program p; main { print(1 + 2); } end").unwrap();
    let generated = crate::codegen::generate(&program).unwrap();
    let bundle = ObjectBundle::from_generated("p.baby", "0", &generated);

    let mut buf = Vec::new();
    write_obj(&bundle, &mut buf).unwrap();
    let decoded = read_obj(&mut &buf[..]).unwrap();

    assert_eq!(decoded.header.filename, bundle.header.filename);
    assert_eq!(decoded.header.version, BUNDLE_VERSION);
    assert_eq!(decoded.constants.len(), bundle.constants.len());
    assert_eq!(decoded.scopes.len(), bundle.scopes.len());
    assert_eq!(decoded.quads.len(), bundle.quads.len());
}

#[test]
fn rejects_a_future_bundle_version() {
    let program = crate::parser::parse("program p; main { } end").unwrap();
    let generated = crate::codegen::generate(&program).unwrap();
    let mut bundle = ObjectBundle::from_generated("p.baby", "0", &generated);
    bundle.header.version = BUNDLE_VERSION + 1;

    let mut buf = Vec::new();
    write_obj(&bundle, &mut buf).unwrap();
    assert!(matches!(read_obj(&mut &buf[..]), Err(BundleError::UnsupportedVersion { .. })));
}
