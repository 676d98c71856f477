//
// builtins.rs
//
// Built-in function and standard UDF signatures, macros and keywords, loaded
// from the embedded data/builtins.json catalogue.
//

use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::signature::{Parameter, Signature, SignatureMap};

const CATALOGUE_JSON: &str = include_str!("../data/builtins.json");

#[derive(Debug, Deserialize)]
struct BuiltinFunction {
    name: String,
    /// Standard UDF library defining the function; core functions have none
    #[serde(default)]
    library: Option<String>,
    doc: String,
    #[serde(default)]
    params: Vec<(String, String)>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalogue {
    #[serde(default)]
    functions: Vec<BuiltinFunction>,
    #[serde(default)]
    macros: Vec<(String, String)>,
    #[serde(default)]
    keywords: Vec<String>,
}

fn catalogue() -> &'static Catalogue {
    static CATALOGUE: OnceLock<Catalogue> = OnceLock::new();
    CATALOGUE.get_or_init(|| match serde_json::from_str(CATALOGUE_JSON) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to parse built-in catalogue: {}", e);
            Catalogue::default()
        }
    })
}

impl BuiltinFunction {
    fn to_signature(&self) -> Signature {
        let mut parameters = IndexMap::new();
        for (name, doc) in &self.params {
            parameters.insert(
                name.clone(),
                Parameter {
                    name: name.clone(),
                    documentation: Some(doc.clone()),
                },
            );
        }
        let label = self.label.clone().unwrap_or_else(|| {
            let names: Vec<&str> = self.params.iter().map(|(n, _)| n.as_str()).collect();
            format!("{}({})", self.name, names.join(", "))
        });
        Signature {
            name: self.name.clone(),
            label,
            documentation: self.doc.clone(),
            parameters,
            offset: None,
        }
    }
}

/// Built-in function signatures keyed by lower-cased name
pub fn builtin_signatures() -> &'static SignatureMap {
    static SIGNATURES: OnceLock<SignatureMap> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        catalogue()
            .functions
            .iter()
            .map(|f| (f.name.to_lowercase(), f.to_signature()))
            .collect()
    })
}

/// Macros as `(name, documentation)` pairs; names keep the `@`
pub fn macros() -> &'static [(String, String)] {
    &catalogue().macros
}

pub fn macro_doc(name: &str) -> Option<&'static str> {
    macros()
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(name))
        .map(|(_, doc)| doc.as_str())
}

pub fn keywords() -> &'static [String] {
    &catalogue().keywords
}

pub fn is_keyword(word: &str) -> bool {
    keywords().iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Standard UDF libraries whose functions the catalogue carries. Bracketed
/// includes of these are skipped; any other library resolves through the
/// include paths like a user file.
pub fn default_library_allowlist() -> Vec<String> {
    let mut libraries: Vec<String> = Vec::new();
    for library in catalogue().functions.iter().filter_map(|f| f.library.as_ref()) {
        if !libraries.contains(library) {
            libraries.push(library.clone());
        }
    }
    libraries
}
