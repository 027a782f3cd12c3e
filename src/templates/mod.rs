//! Loads the set of named view templates.
//!
//! Templates come either from an operator supplied directory or from the
//! sources built into the binary. Both paths register every template by name
//! in a single [`minijinja::Environment`], and the result is only handed out
//! once all of the required views are present.

use std::{
    borrow::Cow,
    fmt::{self, Display},
    fs, io,
    path::{Path, PathBuf},
};

use minijinja::{Environment, Template};
use serde::{Deserialize, Serialize};

mod builtin;

/// Logo shown when the config doesn't override it.
pub const DEFAULT_LOGO_URL: &str =
    "https://coreos.com/assets/images/brand/coreos-wordmark-135x40px.png";

/// Issuer name shown when the config doesn't override it.
pub const DEFAULT_ISSUER: &str = "dex";

/// Describes where templates are loaded from and how pages are branded.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory of the templates. If empty, the built-in templates are used.
    pub dir: Option<PathBuf>,

    /// Defaults to [`DEFAULT_LOGO_URL`].
    #[serde(rename = "logoURL")]
    pub logo_url: Option<String>,
    /// Defaults to [`DEFAULT_ISSUER`].
    #[serde(rename = "issuerName")]
    pub issuer: Option<String>,
}

/// Branding data merged into every view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GlobalData {
    pub logo_url: String,
    pub issuer: String,
}

impl GlobalData {
    /// Resolves the branding from a config, filling in defaults for blank values.
    pub fn from_config(config: &TemplateConfig) -> Self {
        fn or_default(value: &Option<String>, default: &str) -> String {
            match value.as_deref() {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => default.to_string(),
            }
        }

        Self {
            logo_url: or_default(&config.logo_url, DEFAULT_LOGO_URL),
            issuer: or_default(&config.issuer, DEFAULT_ISSUER),
        }
    }
}

/// A page that can be rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Approval,
    Login,
    Password,
    /// Displays an out-of-band code for the user to copy.
    Oob,
}

impl View {
    /// Every view, in the order missing templates are reported.
    pub const ALL: [View; 4] = [View::Approval, View::Login, View::Password, View::Oob];

    /// Name of the template that renders this view.
    pub fn template_name(self) -> &'static str {
        match self {
            View::Approval => "approval.html",
            View::Login => "login.html",
            View::Password => "password.html",
            View::Oob => "oob.html",
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_name())
    }
}

/// Indicates the template set could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The template directory could not be listed.
    ReadDir { path: PathBuf, source: io::Error },
    /// A file in the template directory could not be read.
    ReadFile { path: PathBuf, source: io::Error },
    /// The template directory contained no files.
    NoTemplates { path: PathBuf },
    /// A template failed to parse.
    Parse {
        name: String,
        source: minijinja::Error,
    },
    /// One or more required templates were not defined.
    Missing { names: Vec<&'static str> },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ReadDir { path, source } => {
                write!(f, "read directory {}: {}", path.display(), source)
            }
            LoadError::ReadFile { path, source } => {
                write!(f, "read template file {}: {}", path.display(), source)
            }
            LoadError::NoTemplates { path } => {
                write!(f, "no templates found in {}", path.display())
            }
            LoadError::Parse { name, source } => {
                write!(f, "parse failure in template {name}: {source}")
            }
            LoadError::Missing { names } => {
                write!(f, "missing templates: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::ReadDir { source, .. } | LoadError::ReadFile { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
            LoadError::NoTemplates { .. } | LoadError::Missing { .. } => None,
        }
    }
}

/// The validated template set.
///
/// Immutable once loaded; share it between request handlers behind an `Arc`.
pub struct Templates {
    env: Environment<'static>,
    global: GlobalData,
}

impl Templates {
    /// Loads and validates the templates described by `config`.
    ///
    /// Reads `config.dir` when it is set, otherwise uses the built-in templates.
    pub fn load(config: &TemplateConfig) -> Result<Self, LoadError> {
        match config.dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                Self::validate(environment_from_dir(dir)?, "directory", config)
            }
            _ => Self::validate(
                environment_from_sources(builtin::SOURCES.iter().copied())?,
                "built-in",
                config,
            ),
        }
    }

    /// Builds the template set from in-memory `(name, source)` pairs.
    ///
    /// `config.dir` is ignored; the branding fields still apply.
    pub fn from_sources<I, N, S>(sources: I, config: &TemplateConfig) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<Cow<'static, str>>,
        S: Into<Cow<'static, str>>,
    {
        Self::validate(environment_from_sources(sources)?, "memory", config)
    }

    fn validate(
        env: Environment<'static>,
        source: &'static str,
        config: &TemplateConfig,
    ) -> Result<Self, LoadError> {
        let missing: Vec<&'static str> = View::ALL
            .iter()
            .map(|view| view.template_name())
            .filter(|name| env.get_template(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::Missing { names: missing });
        }

        let global = GlobalData::from_config(config);

        tracing::info!(source, issuer = %global.issuer, "loaded view templates");

        Ok(Self { env, global })
    }

    /// Returns the branding merged into every view.
    pub fn global(&self) -> &GlobalData {
        &self.global
    }

    /// Returns the template that renders `view`.
    ///
    /// Every view was checked to exist when the set was loaded, so the lookup
    /// itself cannot fail; the error type is the engine's.
    pub(crate) fn template(&self, view: View) -> Result<Template<'_, '_>, minijinja::Error> {
        self.env.get_template(view.template_name())
    }
}

/// Parses every regular file directly inside `dir`, named by its file name.
fn environment_from_dir(dir: &Path) -> Result<Environment<'static>, LoadError> {
    let read_dir_err = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();

        // Follow symlinks so a linked template counts as a file.
        let metadata = fs::metadata(&path).map_err(|source| LoadError::ReadFile {
            path: path.clone(),
            source,
        })?;
        if metadata.is_dir() {
            continue;
        }
        paths.push(path);
    }

    if paths.is_empty() {
        return Err(LoadError::NoTemplates {
            path: dir.to_path_buf(),
        });
    }
    paths.sort();

    let mut env = Environment::new();
    for path in paths {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let bytes = fs::read(&path).map_err(|source| LoadError::ReadFile {
            path: path.clone(),
            source,
        })?;
        // Files that aren't valid UTF-8 still load, with bad bytes replaced.
        let source = String::from_utf8_lossy(&bytes).into_owned();

        tracing::debug!(template = %name, path = %path.display(), "parsing template");

        env.add_template_owned(name.clone(), source)
            .map_err(|source| LoadError::Parse { name, source })?;
    }

    Ok(env)
}

/// Parses an in-memory set of templates, each registered under its own name.
fn environment_from_sources<I, N, S>(sources: I) -> Result<Environment<'static>, LoadError>
where
    I: IntoIterator<Item = (N, S)>,
    N: Into<Cow<'static, str>>,
    S: Into<Cow<'static, str>>,
{
    let mut env = Environment::new();
    for (name, source) in sources {
        let name = name.into();
        tracing::debug!(template = %name, "parsing template");

        env.add_template_owned(name.clone(), source)
            .map_err(|source| LoadError::Parse {
                name: name.into_owned(),
                source,
            })?;
    }

    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_views(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), format!("{name}: {{{{ issuer }}}}")).unwrap();
        }
    }

    fn dir_config(dir: &TempDir) -> TemplateConfig {
        TemplateConfig {
            dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_templates_load() {
        let templates = Templates::load(&TemplateConfig::default()).unwrap();

        let mut names = Vec::new();
        for view in View::ALL {
            let template = templates.template(view).unwrap();
            assert_eq!(template.name(), view.template_name());
            assert!(!template.source().is_empty());
            names.push(template.name().to_string());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_builtin_sources_define_required_views() {
        for view in View::ALL {
            assert!(
                builtin::SOURCES
                    .iter()
                    .any(|(name, _)| *name == view.template_name()),
                "built-in sources are missing {view}"
            );
        }
    }

    #[test]
    fn test_directory_templates_load() {
        let dir = TempDir::new().unwrap();
        write_views(
            dir.path(),
            &["approval.html", "login.html", "password.html", "oob.html"],
        );

        let templates = Templates::load(&dir_config(&dir)).unwrap();

        let mut names = Vec::new();
        for view in View::ALL {
            let template = templates.template(view).unwrap();
            assert_eq!(template.name(), view.template_name());
            assert!(!template.source().is_empty());
            names.push(template.name().to_string());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);

        let login = templates.template(View::Login).unwrap();
        assert_eq!(login.render(minijinja::context! { issuer => "x" }).unwrap(), "login.html: x");
    }

    #[test]
    fn test_directory_accepts_non_utf8_files() {
        let dir = TempDir::new().unwrap();
        write_views(
            dir.path(),
            &["approval.html", "login.html", "password.html", "oob.html"],
        );
        fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0xff, 0xfe, 0x00]).unwrap();

        let templates = Templates::load(&dir_config(&dir)).unwrap();
        assert!(templates.template(View::Oob).is_ok());
    }

    #[test]
    fn test_directory_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        write_views(
            dir.path(),
            &["approval.html", "login.html", "password.html", "oob.html"],
        );
        fs::create_dir(dir.path().join("partials")).unwrap();
        fs::write(dir.path().join("partials").join("broken.html"), "{% if %}").unwrap();

        assert!(Templates::load(&dir_config(&dir)).is_ok());
    }

    #[test]
    fn test_directory_templates_can_include_each_other() {
        let dir = TempDir::new().unwrap();
        write_views(dir.path(), &["approval.html", "password.html", "oob.html"]);
        fs::write(dir.path().join("layout.html"), "[{{ issuer }}]").unwrap();
        fs::write(dir.path().join("login.html"), "{% include \"layout.html\" %}").unwrap();

        let templates = Templates::load(&dir_config(&dir)).unwrap();
        let login = templates.template(View::Login).unwrap();
        assert_eq!(login.render(minijinja::context! { issuer => "dex" }).unwrap(), "[dex]");
    }

    #[test]
    fn test_missing_templates_are_all_reported() {
        let dir = TempDir::new().unwrap();
        write_views(dir.path(), &["login.html", "password.html"]);

        let err = Templates::load(&dir_config(&dir)).err().unwrap();
        match err {
            LoadError::Missing { names } => assert_eq!(names, vec!["approval.html", "oob.html"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_error_lists_every_name() {
        let err = LoadError::Missing {
            names: vec!["approval.html", "oob.html"],
        };
        assert_eq!(err.to_string(), "missing templates: approval.html, oob.html");
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let err = Templates::load(&dir_config(&dir)).err().unwrap();
        assert!(matches!(err, LoadError::NoTemplates { .. }));
    }

    #[test]
    fn test_nonexistent_directory() {
        let dir = TempDir::new().unwrap();
        let config = TemplateConfig {
            dir: Some(dir.path().join("does-not-exist")),
            ..Default::default()
        };

        let err = Templates::load(&config).err().unwrap();
        assert!(matches!(err, LoadError::ReadDir { .. }));
        assert!(err.to_string().starts_with("read directory"));
    }

    #[test]
    fn test_parse_failure_names_file() {
        let dir = TempDir::new().unwrap();
        write_views(dir.path(), &["approval.html", "login.html", "oob.html"]);
        fs::write(dir.path().join("password.html"), "{% for x in %}").unwrap();

        let err = Templates::load(&dir_config(&dir)).err().unwrap();
        match &err {
            LoadError::Parse { name, .. } => assert_eq!(name, "password.html"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("password.html"));
    }

    #[test]
    fn test_from_sources() {
        let sources = vec![
            ("approval.html".to_string(), "a".to_string()),
            ("login.html".to_string(), "l".to_string()),
            ("password.html".to_string(), "p".to_string()),
            ("oob.html".to_string(), "o".to_string()),
        ];
        let templates = Templates::from_sources(sources, &TemplateConfig::default()).unwrap();
        assert_eq!(templates.template(View::Oob).unwrap().source(), "o");
    }

    #[test]
    fn test_from_sources_missing() {
        let err = Templates::from_sources([("login.html", "l")], &TemplateConfig::default())
            .err()
            .unwrap();
        match err {
            LoadError::Missing { names } => {
                assert_eq!(names, vec!["approval.html", "password.html", "oob.html"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_sources_parse_failure() {
        let err = Templates::from_sources(
            [("login.html", "{{ unclosed")],
            &TemplateConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, LoadError::Parse { ref name, .. } if name == "login.html"));
    }

    #[test]
    fn test_empty_dir_path_uses_builtin() {
        let config = TemplateConfig {
            dir: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(Templates::load(&config).is_ok());
    }

    #[test]
    fn test_default_branding() {
        let global = GlobalData::from_config(&TemplateConfig {
            dir: None,
            logo_url: Some(String::new()),
            issuer: None,
        });
        assert_eq!(global.logo_url, DEFAULT_LOGO_URL);
        assert_eq!(global.issuer, "dex");
    }

    #[test]
    fn test_configured_branding() {
        let config = TemplateConfig {
            dir: None,
            logo_url: Some("https://example.com/logo.png".into()),
            issuer: Some("Example".into()),
        };
        let templates = Templates::load(&config).unwrap();
        assert_eq!(
            templates.global(),
            &GlobalData {
                logo_url: "https://example.com/logo.png".into(),
                issuer: "Example".into(),
            }
        );
    }

    #[test]
    fn test_config_deserialize() {
        let config: TemplateConfig = serde_json::from_str(
            r#"{"dir": "web/templates", "logoURL": "/logo.svg", "issuerName": "Acme"}"#,
        )
        .unwrap();
        assert_eq!(config.dir, Some(PathBuf::from("web/templates")));
        assert_eq!(config.logo_url.as_deref(), Some("/logo.svg"));
        assert_eq!(config.issuer.as_deref(), Some("Acme"));

        let empty: TemplateConfig = serde_json::from_str("{}").unwrap();
        assert!(empty.dir.is_none());
    }
}
