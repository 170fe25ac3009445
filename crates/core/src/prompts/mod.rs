use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILT_IN_PROMPTS: &str = include_str!("../../prompts/default.toml");

pub type PromptArguments = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt `{0}` not found")]
    NotFound(String),
    #[error("missing argument `{argument}` when rendering prompt `{key}`")]
    MissingArgument { key: String, argument: String },
    #[error("failed to read prompt file `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse built-in prompt definitions: {0}")]
    ParseBuiltIn(toml::de::Error),
    #[error("failed to parse prompt file `{path}` as TOML: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse prompt file `{path}` as YAML: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error(
        "required key `{argument}` declared for prompt `{key}` but no matching placeholder was found"
    )]
    InvalidRequired { key: String, argument: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptSource {
    BuiltIn,
    File(PathBuf),
}

impl PromptSource {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::BuiltIn)
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::BuiltIn => None,
            Self::File(path) => Some(path.as_path()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromptMetadata {
    description: Option<String>,
    source: PromptSource,
}

impl PromptMetadata {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source(&self) -> &PromptSource {
        &self.source
    }
}

#[derive(Clone, Debug)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// One named instruction template. Placeholders use `{name}`; `{{` and `}}`
/// escape literal braces. Arguments not covered by a placeholder are ignored,
/// placeholders without an argument render empty.
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    key: String,
    template: String,
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
    required: BTreeSet<String>,
    metadata: PromptMetadata,
}

impl PromptTemplate {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(|s| s.as_str())
    }

    pub fn required_arguments(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(|s| s.as_str())
    }

    pub fn metadata(&self) -> &PromptMetadata {
        &self.metadata
    }

    pub fn render(&self, arguments: &PromptArguments) -> Result<String, PromptError> {
        for required in &self.required {
            if !arguments.contains_key(required) {
                return Err(PromptError::MissingArgument {
                    key: self.key.clone(),
                    argument: required.clone(),
                });
            }
        }

        let mut output = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = arguments.get(name) {
                        output.push_str(value);
                    }
                }
            }
        }

        Ok(output)
    }

    pub fn render_with<I, K, V>(&self, arguments: I) -> Result<String, PromptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: PromptArguments = arguments
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.render(&map)
    }

    fn from_raw(key: String, raw: RawPrompt, source: PromptSource) -> Result<Self, PromptError> {
        let (segments, placeholders) = parse_template(&raw.template);

        // An empty `required` list means every placeholder is mandatory.
        let required = if raw.required.is_empty() {
            placeholders.clone()
        } else {
            let mut set = BTreeSet::new();
            for argument in raw.required {
                let trimmed = argument.trim().to_string();
                if !placeholders.contains(&trimmed) {
                    return Err(PromptError::InvalidRequired {
                        key: key.clone(),
                        argument: trimmed,
                    });
                }
                set.insert(trimmed);
            }
            set
        };

        Ok(Self {
            key,
            template: raw.template,
            segments,
            placeholders,
            required,
            metadata: PromptMetadata {
                description: raw.description,
                source,
            },
        })
    }
}

/// Registry of instruction templates: the embedded defaults, optionally
/// overridden by TOML/YAML files from custom directories. Later directories
/// win, files within a directory are applied in name order.
#[derive(Debug)]
pub struct PromptRegistry {
    prompts: BTreeMap<String, PromptTemplate>,
    directories: Vec<PathBuf>,
}

impl PromptRegistry {
    pub fn new() -> Result<Self, PromptError> {
        Self::with_custom_directories::<&Path>(&[])
    }

    pub fn with_custom_directories<P: AsRef<Path>>(directories: &[P]) -> Result<Self, PromptError> {
        let directories: Vec<PathBuf> = directories
            .iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        let prompts = build_prompts(&directories)?;
        Ok(Self {
            prompts,
            directories,
        })
    }

    pub fn custom_directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn reload(&mut self) -> Result<(), PromptError> {
        self.prompts = build_prompts(&self.directories)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&PromptTemplate> {
        self.prompts.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.prompts.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(|k| k.as_str())
    }

    pub fn format(&self, key: &str, args: &PromptArguments) -> Result<String, PromptError> {
        self.get(key)
            .ok_or_else(|| PromptError::NotFound(key.to_string()))?
            .render(args)
    }

    pub fn format_with<I, K, V>(&self, key: &str, arguments: I) -> Result<String, PromptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.get(key)
            .ok_or_else(|| PromptError::NotFound(key.to_string()))?
            .render_with(arguments)
    }
}

fn build_prompts(
    directories: &[PathBuf],
) -> Result<BTreeMap<String, PromptTemplate>, PromptError> {
    let mut prompts = BTreeMap::new();

    let document: PromptDocument =
        toml::from_str(BUILT_IN_PROMPTS).map_err(PromptError::ParseBuiltIn)?;
    for (key, raw) in document.prompts {
        let template = PromptTemplate::from_raw(key.clone(), raw, PromptSource::BuiltIn)?;
        prompts.insert(key, template);
    }

    for dir in directories {
        load_directory(dir, &mut prompts)?;
    }

    Ok(prompts)
}

fn load_directory(
    dir: &Path,
    prompts: &mut BTreeMap<String, PromptTemplate>,
) -> Result<(), PromptError> {
    if !dir.is_dir() {
        return Ok(());
    }

    let read_dir = fs::read_dir(dir).map_err(|source| PromptError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| PromptError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let document = match ext.to_ascii_lowercase().as_str() {
            "toml" => {
                let contents = read_file(&path)?;
                toml::from_str::<PromptDocument>(&contents).map_err(|source| {
                    PromptError::ParseToml {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            "yaml" | "yml" => {
                let contents = read_file(&path)?;
                serde_yaml::from_str::<PromptDocument>(&contents).map_err(|source| {
                    PromptError::ParseYaml {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            _ => continue,
        };

        for (key, raw) in document.prompts {
            let template =
                PromptTemplate::from_raw(key.clone(), raw, PromptSource::File(path.clone()))?;
            prompts.insert(key, template);
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String, PromptError> {
    fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct PromptDocument {
    #[serde(default)]
    prompts: BTreeMap<String, RawPrompt>,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    #[serde(alias = "text")]
    template: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required: Vec<String>,
}

fn parse_template(template: &str) -> (Vec<Segment>, BTreeSet<String>) {
    let mut segments = Vec::new();
    let mut placeholders = BTreeSet::new();
    let mut buffer = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some('{')) => {
                chars.next();
                buffer.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }

                let trimmed = name.trim();
                if closed && !trimmed.is_empty() {
                    if !buffer.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut buffer)));
                    }
                    placeholders.insert(trimmed.to_string());
                    segments.push(Segment::Placeholder(trimmed.to_string()));
                } else if closed {
                    buffer.push_str("{}");
                } else {
                    // Unterminated placeholder: keep the raw text.
                    buffer.push('{');
                    buffer.push_str(&name);
                }
            }
            '}' => {
                if matches!(chars.peek(), Some('}')) {
                    chars.next();
                }
                buffer.push('}');
            }
            _ => buffer.push(ch),
        }
    }

    if !buffer.is_empty() {
        segments.push(Segment::Literal(buffer));
    }

    (segments, placeholders)
}
