//! Schema model: typed, constrained columns and YAML persistence.
//!
//! A [`Schema`] is an immutable ordered sequence of [`Column`]s built once and
//! consulted for every row. Each column carries a pure validator derived from
//! its declarative attributes (type, nullability, format pattern, comma/space
//! allowances); the alignment search in [`crate::align`] treats those
//! validators as black-box predicates.
//!
//! Schemas for the built-in column types round-trip through YAML. Custom
//! columns carry a caller-supplied predicate and can only be constructed
//! programmatically; a YAML schema declaring `custom` fails at load time.

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr, sync::Arc};

use anyhow::{Context, Result, anyhow, bail, ensure};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::parse_naive_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    DateTime,
    Custom,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::DateTime => "datetime",
            ColumnType::Custom => "custom",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["string", "integer", "float", "datetime"]
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" => Ok(ColumnType::String),
            "integer" | "int" => Ok(ColumnType::Integer),
            "float" | "double" => Ok(ColumnType::Float),
            "datetime" | "date-time" | "timestamp" => Ok(ColumnType::DateTime),
            "custom" => Err(anyhow!(
                "Custom columns require a validator and cannot be declared in a schema file"
            )),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(serde::de::Error::custom)
    }
}

/// Full-match format pattern for string columns.
#[derive(Debug, Clone)]
struct FormatPattern {
    pattern: String,
    regex: Regex,
}

impl FormatPattern {
    fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .with_context(|| format!("Compiling format pattern '{pattern}'"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    fn matches(&self, token: &str) -> bool {
        self.regex.is_match(token)
    }
}

/// Caller-supplied backing for a custom column: the validation predicate and
/// the display text the record sink uses for null cells.
#[derive(Clone)]
struct CustomSpec {
    empty_value: String,
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl fmt::Debug for CustomSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomSpec")
            .field("empty_value", &self.empty_value)
            .finish_non_exhaustive()
    }
}

/// One typed, constrained column. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ColumnFile", into = "ColumnFile")]
pub struct Column {
    name: String,
    datatype: ColumnType,
    nullable: bool,
    allows_commas: bool,
    allows_spaces: bool,
    format: Option<FormatPattern>,
    custom: Option<CustomSpec>,
}

/// YAML-facing shape of a column definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnFile {
    name: String,
    datatype: ColumnType,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    allows_commas: bool,
    #[serde(default)]
    allows_spaces: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

impl TryFrom<ColumnFile> for Column {
    type Error = anyhow::Error;

    fn try_from(file: ColumnFile) -> Result<Self> {
        let format = match file.format.as_deref() {
            Some(pattern) => {
                ensure!(
                    file.datatype == ColumnType::String,
                    "Column '{}': format patterns only apply to string columns",
                    file.name
                );
                Some(FormatPattern::compile(pattern)?)
            }
            None => None,
        };
        // Accepted datetime formats include a date/time separator space, so
        // the flag must hold for datetime columns no matter what the file says.
        let allows_spaces = file.allows_spaces || file.datatype == ColumnType::DateTime;
        Ok(Column {
            name: file.name,
            datatype: file.datatype,
            nullable: file.nullable,
            allows_commas: file.allows_commas,
            allows_spaces,
            format,
            custom: None,
        })
    }
}

impl From<Column> for ColumnFile {
    fn from(column: Column) -> Self {
        ColumnFile {
            name: column.name,
            datatype: column.datatype,
            nullable: column.nullable,
            allows_commas: column.allows_commas,
            allows_spaces: column.allows_spaces,
            format: column.format.map(|f| f.pattern),
        }
    }
}

impl Column {
    pub fn string(name: &str, nullable: bool, allows_commas: bool, allows_spaces: bool) -> Self {
        Column {
            name: name.to_string(),
            datatype: ColumnType::String,
            nullable,
            allows_commas,
            allows_spaces,
            format: None,
            custom: None,
        }
    }

    pub fn string_with_format(
        name: &str,
        nullable: bool,
        allows_commas: bool,
        allows_spaces: bool,
        pattern: &str,
    ) -> Result<Self> {
        let mut column = Column::string(name, nullable, allows_commas, allows_spaces);
        column.format = Some(FormatPattern::compile(pattern)?);
        Ok(column)
    }

    pub fn integer(name: &str, nullable: bool) -> Self {
        Column {
            name: name.to_string(),
            datatype: ColumnType::Integer,
            nullable,
            allows_commas: false,
            allows_spaces: false,
            format: None,
            custom: None,
        }
    }

    pub fn float(name: &str, nullable: bool) -> Self {
        Column {
            name: name.to_string(),
            datatype: ColumnType::Float,
            nullable,
            allows_commas: false,
            allows_spaces: false,
            format: None,
            custom: None,
        }
    }

    pub fn datetime(name: &str, nullable: bool) -> Self {
        Column {
            name: name.to_string(),
            datatype: ColumnType::DateTime,
            nullable,
            allows_commas: false,
            // Accepted datetime formats include a date/time separator space.
            allows_spaces: true,
            format: None,
            custom: None,
        }
    }

    pub fn custom<F>(
        name: &str,
        nullable: bool,
        allows_commas: bool,
        allows_spaces: bool,
        empty_value: &str,
        predicate: F,
    ) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Column {
            name: name.to_string(),
            datatype: ColumnType::Custom,
            nullable,
            allows_commas,
            allows_spaces,
            format: None,
            custom: Some(CustomSpec {
                empty_value: empty_value.to_string(),
                predicate: Arc::new(predicate),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> ColumnType {
        self.datatype
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn allows_commas(&self) -> bool {
        self.allows_commas
    }

    pub fn allows_spaces(&self) -> bool {
        self.allows_spaces
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_ref().map(|f| f.pattern.as_str())
    }

    /// Display text for a null cell in this column.
    pub fn empty_value(&self) -> &str {
        self.custom
            .as_ref()
            .map(|spec| spec.empty_value.as_str())
            .unwrap_or("")
    }

    /// Pure per-token validity predicate.
    ///
    /// The token is trimmed before any check. Comma and space allowances are
    /// enforced here only for the single-token case; merge eligibility across
    /// tokens is decided by the alignment graph, not this predicate.
    pub fn is_valid(&self, token: &str) -> bool {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return self.nullable;
        }
        if !self.allows_commas && trimmed.contains(',') {
            return false;
        }
        if !self.allows_spaces && trimmed.contains(' ') {
            return false;
        }
        match self.datatype {
            ColumnType::String => self.format.as_ref().is_none_or(|f| f.matches(trimmed)),
            ColumnType::Integer => trimmed.parse::<i64>().is_ok(),
            ColumnType::Float => trimmed.parse::<f64>().is_ok(),
            ColumnType::DateTime => parse_naive_datetime(trimmed).is_ok(),
            ColumnType::Custom => match &self.custom {
                Some(spec) => (spec.predicate)(trimmed),
                None => false,
            },
        }
    }
}

/// Immutable ordered column sequence. Any change requires building a new
/// schema; no mutation is exposed post-build.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaFile {
    columns: Vec<Column>,
}

impl Schema {
    /// Builds a schema, failing on an empty column list, duplicate names, or
    /// a custom column missing its backing predicate.
    pub fn build(columns: Vec<Column>) -> Result<Self> {
        ensure!(
            !columns.is_empty(),
            "Schema requires at least one column definition"
        );
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                bail!("Duplicate column name '{}' in schema", column.name);
            }
            if column.datatype == ColumnType::Custom && column.custom.is_none() {
                bail!(
                    "Custom column '{}' is missing its validation predicate",
                    column.name
                );
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_at(&self, position: usize) -> &Column {
        &self.columns[position]
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn is_token_valid(&self, token: &str, position: usize) -> bool {
        self.columns[position].is_valid(token)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let parsed: SchemaFile = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Schema::build(parsed.columns)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure!(
            !self
                .columns
                .iter()
                .any(|c| c.datatype == ColumnType::Custom),
            "Schemas containing custom columns cannot be saved to YAML"
        );
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        let shape = SchemaFile {
            columns: self.columns.clone(),
        };
        serde_yaml::to_writer(file, &shape).context("Writing schema YAML")
    }

    /// Rows for the diagnostic table rendered by the `schema` subcommand.
    pub fn describe_rows(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                vec![
                    (idx + 1).to_string(),
                    column.name.clone(),
                    column.datatype.to_string(),
                    column.nullable.to_string(),
                    column.allows_commas.to_string(),
                    column.allows_spaces.to_string(),
                    column.format().unwrap_or("").to_string(),
                ]
            })
            .collect()
    }

    pub fn describe_headers() -> Vec<String> {
        ["#", "name", "type", "nullable", "commas", "spaces", "format"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}
