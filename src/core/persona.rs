use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::config::data::path_display;

/// A selectable character whose introduction becomes the system prompt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Persona {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub introduction: String,
    /// Gallery image for this persona; its file stem should match `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<Persona>,
}

#[derive(Debug)]
pub enum PersonaError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Ids must be usable as a file stem: non-empty, no separators, no dots.
    InvalidId(String),
    DuplicateId(String),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::Read { path, source } => {
                write!(f, "Failed to read personas at {}: {}", path_display(path), source)
            }
            PersonaError::Parse { path, source } => {
                write!(f, "Failed to parse personas at {}: {}", path_display(path), source)
            }
            PersonaError::InvalidId(id) => write!(
                f,
                "Invalid persona id '{id}': ids must be non-empty and contain no '/', '\\' or '.'"
            ),
            PersonaError::DuplicateId(id) => write!(f, "Persona '{id}' is defined more than once"),
        }
    }
}

impl std::error::Error for PersonaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersonaError::Read { source, .. } => Some(source),
            PersonaError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Which persona the user picked, reduced to a persona id.
///
/// The gallery hands back the selected item as a path-like string
/// (`"images/socrates.png"`). It is converted here, once, by taking the file
/// stem; a bare id such as `"socrates"` is already its own stem. Labels are
/// never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaSelection(String);

impl PersonaSelection {
    pub fn from_gallery_item(item: &str) -> Self {
        let stem = Path::new(item.trim())
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self(stem)
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Outcome of persona resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedPersona {
    /// `None` only when the store is empty
    pub id: Option<String>,
    pub system_prompt: String,
}

/// Ordered collection of personas; "first" means first in file order.
#[derive(Debug, Clone, Default)]
pub struct PersonaStore {
    personas: Vec<Persona>,
}

impl PersonaStore {
    pub fn new(personas: Vec<Persona>) -> Result<Self, PersonaError> {
        let mut seen = HashSet::new();
        for persona in &personas {
            let id = persona.id.as_str();
            if id.is_empty() || id.contains(|c| matches!(c, '/' | '\\' | '.')) {
                return Err(PersonaError::InvalidId(persona.id.clone()));
            }
            if !seen.insert(id) {
                return Err(PersonaError::DuplicateId(persona.id.clone()));
            }
        }
        Ok(Self { personas })
    }

    /// Load personas from a TOML file of `[[personas]]` tables. A missing file
    /// is an empty store.
    pub fn load_from_path(path: &Path) -> Result<Self, PersonaError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| PersonaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PersonaFile = toml::from_str(&contents).map_err(|source| PersonaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file.personas)
    }

    pub fn list(&self) -> &[Persona] {
        &self.personas
    }

    pub fn find(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn first(&self) -> Option<&Persona> {
        self.personas.first()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Pick the active persona and its system prompt.
    ///
    /// An empty or absent selection falls back to the first persona. A selection
    /// naming an unknown persona keeps that id but yields an empty prompt.
    pub fn resolve(&self, selection: Option<&PersonaSelection>) -> ResolvedPersona {
        let id = selection
            .map(PersonaSelection::id)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .or_else(|| self.first().map(|p| p.id.clone()));

        let Some(id) = id else {
            return ResolvedPersona::default();
        };

        let system_prompt = match self.find(&id) {
            Some(persona) => persona.introduction.clone(),
            None => {
                warn!(persona = %id, "selected persona is not defined; using an empty system prompt");
                String::new()
            }
        };

        ResolvedPersona {
            id: Some(id),
            system_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn persona(id: &str, introduction: &str) -> Persona {
        Persona {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            introduction: introduction.to_string(),
            image: Some(format!("images/{id}.png")),
        }
    }

    fn create_test_store() -> PersonaStore {
        PersonaStore::new(vec![
            persona("socrates", "I know that I know nothing."),
            persona("hypatia", "Reserve your right to think."),
            persona("seneca", "Luck is preparation meeting opportunity."),
        ])
        .unwrap()
    }

    #[test]
    fn gallery_items_reduce_to_file_stem() {
        for item in [
            "socrates",
            "socrates.png",
            "images/socrates.png",
            "/tmp/gradio/abc123/socrates.webp",
            "  images/socrates.jpg ",
        ] {
            assert_eq!(PersonaSelection::from_gallery_item(item).id(), "socrates", "{item}");
        }
        assert_eq!(PersonaSelection::from_gallery_item("").id(), "");
    }

    #[test]
    fn every_persona_resolves_to_its_introduction() {
        let store = create_test_store();
        for p in store.list() {
            let selection = p
                .image
                .as_deref()
                .map(PersonaSelection::from_gallery_item)
                .unwrap();
            let resolved = store.resolve(Some(&selection));
            assert_eq!(resolved.id.as_deref(), Some(p.id.as_str()));
            assert_eq!(resolved.system_prompt, p.introduction);
        }
    }

    #[test]
    fn missing_or_empty_selection_falls_back_to_first_persona() {
        let store = create_test_store();
        let expected = ResolvedPersona {
            id: Some("socrates".to_string()),
            system_prompt: "I know that I know nothing.".to_string(),
        };

        assert_eq!(store.resolve(None), expected);
        assert_eq!(
            store.resolve(Some(&PersonaSelection::from_gallery_item(""))),
            expected
        );
    }

    #[test]
    fn unknown_persona_yields_empty_prompt() {
        let store = create_test_store();
        let resolved = store.resolve(Some(&PersonaSelection::from_gallery_item("images/kant.png")));
        assert_eq!(resolved.id.as_deref(), Some("kant"));
        assert_eq!(resolved.system_prompt, "");
    }

    #[test]
    fn empty_store_resolves_to_nothing() {
        let store = PersonaStore::default();
        assert_eq!(store.resolve(None), ResolvedPersona::default());
        assert_eq!(
            store
                .resolve(Some(&PersonaSelection::from_gallery_item("plato")))
                .system_prompt,
            ""
        );
    }

    #[test]
    fn rejects_ids_that_are_not_file_stems() {
        for id in ["", "st.augustine", "a/b", "a\\b"] {
            let err = PersonaStore::new(vec![persona(id, "")]).unwrap_err();
            assert!(matches!(err, PersonaError::InvalidId(_)), "{id}");
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = PersonaStore::new(vec![persona("plato", "a"), persona("plato", "b")]).unwrap_err();
        assert!(matches!(err, PersonaError::DuplicateId(ref id) if id == "plato"));
    }

    #[test]
    fn loads_personas_in_file_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("personas.toml");
        fs::write(
            &path,
            r#"
[[personas]]
id = "nietzsche"
display_name = "Friedrich Nietzsche"
introduction = "He who has a why to live can bear almost any how."
image = "images/nietzsche.png"

[[personas]]
id = "aristotle"
display_name = "Aristotle"
introduction = "We are what we repeatedly do."
"#,
        )
        .unwrap();

        let store = PersonaStore::load_from_path(&path).expect("Failed to load personas");
        let ids: Vec<_> = store.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["nietzsche", "aristotle"]);
        assert_eq!(store.first().unwrap().display_name, "Friedrich Nietzsche");
        assert_eq!(store.find("aristotle").unwrap().image, None);
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = PersonaStore::load_from_path(&temp_dir.path().join("none.toml")).unwrap();
        assert!(store.is_empty());
    }
}
