//! # Template Catalog
//!
//! Base designs are looked up by id through a [`TemplateSource`]. The core
//! generators never load templates themselves: callers resolve a
//! [`Template`] first, optionally through a [`TemplateCache`], and pass it in.
//!
//! ```text
//!             _.._
//!          .-'::::'-.      moon       common
//!        .'::o:::::::'.    crescent   uncommon
//!       /::::::::O::::::\  starfield  rare
//!      ;::0:::::::::::o::; eclipse    epic
//!                          phases     legendary
//! ```

use crate::error::{CoreError, Result};
use crate::template::{grid_from_text, Rarity, Template};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Anything that can resolve a template id to a validated [`Template`]
pub trait TemplateSource: Send + Sync {
    /// Load one template. Unknown ids fail with [`CoreError::TemplateNotFound`].
    fn load(&self, id: &str) -> Result<Template>;

    /// All ids this source can serve, sorted
    fn ids(&self) -> Vec<String>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn load(&self, id: &str) -> Result<Template> {
        (**self).load(id)
    }

    fn ids(&self) -> Vec<String> {
        (**self).ids()
    }
}

/// Static definition of a builtin design
struct TemplateDef {
    id: &'static str,
    name: &'static str,
    rarity: Rarity,
    description: &'static str,
    art: &'static str,
    allowed: &'static str,
    forbidden: &'static str,
    themes: &'static [&'static str],
}

const MOON_ART: &str = r#"            _.._
         .-'::::'-.
       .'::o:::::::'.
      /::::::::O::::::\
     ;::0:::::::::::o::;
     |:::::(  )::::::::|
     ;:::::::::::o:::::;
      \::o::::::::::::/
       '.::::::0:::::.'
         '-.::::::.-'
            `''''`
   ~~~~~~~~~~~~~~~~~~~~~~~~~"#;

const CRESCENT_ART: &str = r#"          _.._
        .' .-'`       *
       /  /     .
       |  |           +
       |  |   *    .
       \  \
        '._'-._    .
           ```
    ~~~~---~~~~---~~~~"#;

const STARFIELD_ART: &str = r#"  *        .          +         .      *
      .         *           .
           +          .        *     .
   .            ( o )            +
         *                .         +
    .          .     *         .
  _____________________________________
     ~~~      ~~~~~      ~~~     ~~~~"#;

const ECLIPSE_ART: &str = r#"    +-------------------------+
    |          _____          |
    |      .-'@@@@@@@'-.      |
    |    .'@@@@@@@@@@@@@'.    |
    |   /@@@@@@@@@@@@@@@@@\   |
    |  |@@@@@@@(O)@@@@@@@@@|  |
    |   \@@@@@@@@@@@@@@@@@/   |
    |    '.@@@@@@@@@@@@@.'    |
    |      '-.@@@@@@@.-'      |
    |          -----          |
    +-------------------------+"#;

const PHASES_ART: &str = r#"    .--.    .--.    .--.    .--.    .--.
   ( @@ )  ( @) )  ( OO )  ((o )   (    )
    '--'    '--'    '--'    '--'    '--'
      |       |       |       |       |
   ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
      *       .       +       .       *"#;

const BUILTIN: &[TemplateDef] = &[
    TemplateDef {
        id: "moon",
        name: "Full Moon",
        rarity: Rarity::Common,
        description: "A cratered full moon over a still sea",
        art: MOON_ART,
        allowed: "_.-':oO0/\\;|()`~*+,",
        forbidden: "#$%&@=[]{}<>",
        themes: &["lunar", "celestial"],
    },
    TemplateDef {
        id: "crescent",
        name: "Waxing Crescent",
        rarity: Rarity::Uncommon,
        description: "A thin crescent among scattered stars",
        art: CRESCENT_ART,
        allowed: "_.'-`/|\\*+~:,o",
        forbidden: "#@$%&=",
        themes: &["lunar", "celestial"],
    },
    TemplateDef {
        id: "starfield",
        name: "Starfield",
        rarity: Rarity::Rare,
        description: "A distant moon in a field of stars above the horizon",
        art: STARFIELD_ART,
        allowed: "*.+()o_~'`:-O0",
        forbidden: "#@$%&|/\\",
        themes: &["celestial"],
    },
    TemplateDef {
        id: "eclipse",
        name: "Total Eclipse",
        rarity: Rarity::Epic,
        description: "A framed total eclipse with a bright corona",
        art: ECLIPSE_ART,
        allowed: "+-|_.'@/\\()O0o*=~:^",
        forbidden: "#$%&",
        themes: &["lunar", "geometric"],
    },
    TemplateDef {
        id: "phases",
        name: "Lunar Phases",
        rarity: Rarity::Legendary,
        description: "Five moons marking the cycle from new to full",
        art: PHASES_ART,
        allowed: ".-()@Oo0'|=*+~_:",
        forbidden: "#$%&",
        themes: &["lunar", "geometric", "celestial"],
    },
];

impl TemplateDef {
    fn build(&self) -> Result<Template> {
        Template::from_art(
            self.id,
            self.name,
            self.rarity,
            self.description,
            self.art,
            self.allowed,
            self.forbidden,
            self.themes,
        )
    }
}

/// The static catalog compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl TemplateSource for BuiltinCatalog {
    fn load(&self, id: &str) -> Result<Template> {
        BUILTIN
            .iter()
            .find(|def| def.id == id)
            .ok_or_else(|| CoreError::TemplateNotFound(id.to_string()))?
            .build()
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = BUILTIN.iter().map(|def| def.id.to_string()).collect();
        ids.sort();
        ids
    }
}

/// On-disk template record, one TOML file per template
#[derive(Debug, Deserialize)]
struct TemplateFile {
    id: String,
    name: String,
    rarity: Rarity,
    #[serde(default)]
    description: String,
    art: String,
    allowed: String,
    #[serde(default)]
    forbidden: String,
    #[serde(default)]
    themes: Vec<String>,
}

/// Templates stored as `<dir>/<id>.toml`
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoreError::invalid(
                "template_id",
                format!("'{id}' may only contain letters, digits, '-' and '_'"),
            ));
        }
        Ok(self.root.join(format!("{id}.toml")))
    }
}

impl TemplateSource for DirectoryCatalog {
    fn load(&self, id: &str) -> Result<Template> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(CoreError::TemplateNotFound(id.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        let file: TemplateFile = toml::from_str(&content)?;
        if file.id != id {
            return Err(CoreError::InvalidTemplate(format!(
                "{} declares id '{}'",
                path.display(),
                file.id
            )));
        }

        let template = Template {
            id: file.id,
            name: file.name,
            rarity: file.rarity,
            description: file.description,
            base_grid: grid_from_text(file.art.trim_end_matches('\n')),
            allowed_chars: file.allowed.chars().filter(|c| !c.is_whitespace()).collect(),
            forbidden_chars: file.forbidden.chars().filter(|c| !c.is_whitespace()).collect(),
            themes: file.themes,
        };
        template.validate()?;
        Ok(template)
    }

    fn ids(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        ids
    }
}

/// Two sources where `primary` shadows `fallback`
#[derive(Debug, Clone)]
pub struct LayeredCatalog<A, B> {
    primary: A,
    fallback: B,
}

impl<A: TemplateSource, B: TemplateSource> LayeredCatalog<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: TemplateSource, B: TemplateSource> TemplateSource for LayeredCatalog<A, B> {
    fn load(&self, id: &str) -> Result<Template> {
        match self.primary.load(id) {
            Err(CoreError::TemplateNotFound(_)) => self.fallback.load(id),
            other => other,
        }
    }

    fn ids(&self) -> Vec<String> {
        let ids: BTreeSet<String> = self
            .primary
            .ids()
            .into_iter()
            .chain(self.fallback.ids())
            .collect();
        ids.into_iter().collect()
    }
}

/// Read-through cache over a template source.
///
/// Templates are immutable once loaded, so concurrent callers share one
/// `Arc<Template>` per id. A racing miss may load twice; the first insert wins.
pub struct TemplateCache<S> {
    source: S,
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

impl<S: TemplateSource> TemplateCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a template, loading it from the source on first use
    pub fn get(&self, id: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.entries.read().get(id) {
            return Ok(Arc::clone(template));
        }

        tracing::debug!(template = id, "template cache miss");
        let loaded = Arc::new(self.source.load(id)?);
        let mut entries = self.entries.write();
        let entry = entries.entry(id.to_string()).or_insert(loaded);
        Ok(Arc::clone(entry))
    }

    pub fn ids(&self) -> Vec<String> {
        self.source.ids()
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CUSTOM: &str = r##"
id = "ring"
name = "Ring"
rarity = "rare"
description = "A haloed moon"
art = """
  .-~-.
 ( (o) )
  '-~-'
"""
allowed = ".-~'()o*"
forbidden = "#"
themes = ["lunar"]
"##;

    #[test]
    fn test_builtin_ids() {
        assert_eq!(
            BuiltinCatalog.ids(),
            vec!["crescent", "eclipse", "moon", "phases", "starfield"]
        );
    }

    #[test]
    fn test_builtin_templates_are_valid() {
        for id in BuiltinCatalog.ids() {
            let template = BuiltinCatalog.load(&id).unwrap();
            assert_eq!(template.id, id);
            assert!(!template.themes.is_empty());
            // Every visible base character must be writable so substitutions
            // can move back and forth within the design's alphabet.
            for c in template.base_grid.iter().flatten().filter(|c| **c != ' ') {
                assert!(template.can_write(*c), "{id}: '{c}' not allowed");
            }
        }
    }

    #[test]
    fn test_builtin_unknown_id() {
        let err = BuiltinCatalog.load("sun").unwrap_err();
        assert!(matches!(err, CoreError::TemplateNotFound(id) if id == "sun"));
    }

    #[test]
    fn test_moon_shape() {
        let moon = BuiltinCatalog.load("moon").unwrap();
        assert_eq!(moon.base_grid.len(), 12);
        assert_eq!(moon.rarity, Rarity::Common);
        assert!(moon.visible_chars() > 100);
    }

    #[test]
    fn test_directory_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ring.toml"), CUSTOM).unwrap();

        let catalog = DirectoryCatalog::new(dir.path());
        assert_eq!(catalog.ids(), vec!["ring"]);

        let ring = catalog.load("ring").unwrap();
        assert_eq!(ring.base_grid.len(), 3);
        assert_eq!(ring.art(), "  .-~-.\n ( (o) )\n  '-~-'");
        assert!(matches!(
            catalog.load("moon"),
            Err(CoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_directory_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirectoryCatalog::new(dir.path());
        assert!(matches!(
            catalog.load("../moon"),
            Err(CoreError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_directory_id_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("other.toml"), CUSTOM).unwrap();
        let catalog = DirectoryCatalog::new(dir.path());
        assert!(matches!(
            catalog.load("other"),
            Err(CoreError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_layered_catalog_shadows_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ring.toml"), CUSTOM).unwrap();

        let catalog = LayeredCatalog::new(DirectoryCatalog::new(dir.path()), BuiltinCatalog);
        assert!(catalog.ids().contains(&"ring".to_string()));
        assert!(catalog.ids().contains(&"moon".to_string()));
        assert_eq!(catalog.load("ring").unwrap().name, "Ring");
        assert_eq!(catalog.load("moon").unwrap().name, "Full Moon");
    }

    #[test]
    fn test_boxed_source() {
        let source: Box<dyn TemplateSource> = Box::new(BuiltinCatalog);
        let cache = TemplateCache::new(source);
        assert_eq!(cache.ids().len(), 5);
        assert_eq!(cache.get("phases").unwrap().rarity, Rarity::Legendary);
    }

    #[test]
    fn test_cache_reads_through_once() {
        let cache = TemplateCache::new(BuiltinCatalog);
        assert!(cache.is_empty());

        let first = cache.get("moon").unwrap();
        let second = cache.get("moon").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        assert!(cache.get("nope").is_err());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = Arc::new(TemplateCache::new(BuiltinCatalog));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get("eclipse").map(|t| t.id.clone()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "eclipse");
        }
        assert_eq!(cache.len(), 1);
    }
}
