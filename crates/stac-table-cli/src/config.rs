//! Generate-mode arguments and their validation.
//!
//! Everything here is checked before any file is opened, so a bad invocation
//! never leaves a partially written output behind.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use snafu::{OptionExt, ensure};
use stac_table_core::{BoundingBox, BuildOptions, ItemIdFormat};

use crate::error::{
    CliResult, ConflictingInputsSnafu, InvalidBboxSnafu, MissingBaseUrlSnafu, MissingInputSnafu,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdFormatArg {
    /// YYYY-MM-DD
    Date,
    /// YYYY-MM-DDTHH:MM:SSZ
    Datetime,
}

impl From<IdFormatArg> for ItemIdFormat {
    fn from(v: IdFormatArg) -> Self {
        match v {
            IdFormatArg::Date => ItemIdFormat::Date,
            IdFormatArg::Datetime => ItemIdFormat::DateTime,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct GenerateArgs {
    /// URL prefix the asset files are served under
    #[arg(long, env = "STACTABLE_BASE_URL")]
    pub base_url: Option<String>,

    /// Style document linked from every item
    #[arg(long)]
    pub style_url: Option<String>,

    /// Footprint for every item (default: whole world)
    #[arg(
        long,
        num_args = 4,
        value_names = ["MINX", "MINY", "MAXX", "MAXY"],
        allow_negative_numbers = true
    )]
    pub bbox: Option<Vec<f64>>,

    /// Media type for every asset instead of extension lookup
    #[arg(long)]
    pub asset_type: Option<String>,

    /// Item id rendering (default: datetime)
    #[arg(long, value_enum)]
    pub id_format: Option<IdFormatArg>,

    #[arg(short, long, default_value = "items.parquet")]
    pub output: PathBuf,

    /// Asset file paths
    pub files: Vec<String>,

    /// CSV with a `path` column and optional `date` column
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// JSON array of {"path", "date"} objects
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Paths(Vec<String>),
    Csv(PathBuf),
    Json(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    pub base_url: String,
    pub style_url: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub asset_type: Option<String>,
    pub id_format: ItemIdFormat,
    pub output: PathBuf,
    pub input: InputSource,
}

fn resolve_input(
    files: Vec<String>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
) -> CliResult<InputSource> {
    let mut given = Vec::new();
    if !files.is_empty() {
        given.push("file paths");
    }
    if csv.is_some() {
        given.push("--csv");
    }
    if json.is_some() {
        given.push("--json");
    }
    ensure!(
        given.len() <= 1,
        ConflictingInputsSnafu {
            sources: given.join(", ")
        }
    );

    match (csv, json) {
        (Some(path), _) => Ok(InputSource::Csv(path)),
        (_, Some(path)) => Ok(InputSource::Json(path)),
        _ if !files.is_empty() => Ok(InputSource::Paths(files)),
        _ => MissingInputSnafu.fail(),
    }
}

fn resolve_bbox(values: Option<Vec<f64>>) -> CliResult<Option<BoundingBox>> {
    let Some(values) = values else {
        return Ok(None);
    };
    let rendered = values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    match <[f64; 4]>::try_from(values) {
        Ok(corners) if corners.iter().all(|v| v.is_finite()) => Ok(Some(corners.into())),
        _ => InvalidBboxSnafu { values: rendered }.fail(),
    }
}

impl GenerateConfig {
    pub fn resolve(args: GenerateArgs) -> CliResult<Self> {
        let base_url = args
            .base_url
            .filter(|url| !url.trim().is_empty())
            .context(MissingBaseUrlSnafu)?;

        let input = resolve_input(args.files, args.csv, args.json)?;
        let bbox = resolve_bbox(args.bbox)?;

        Ok(Self {
            base_url,
            style_url: args.style_url,
            bbox,
            asset_type: args.asset_type,
            id_format: args.id_format.map(Into::into).unwrap_or_default(),
            output: args.output,
            input,
        })
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            base_url: self.base_url.clone(),
            style_url: self.style_url.clone(),
            bbox: self.bbox,
            asset_type_override: self.asset_type.clone(),
            id_format: self.id_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    fn args_with_files() -> GenerateArgs {
        GenerateArgs {
            base_url: Some("https://x.test/data".to_string()),
            files: vec!["a.tif".to_string()],
            output: PathBuf::from("items.parquet"),
            ..GenerateArgs::default()
        }
    }

    #[test]
    fn resolves_defaults() -> CliResult<()> {
        let config = GenerateConfig::resolve(args_with_files())?;
        assert_eq!(config.input, InputSource::Paths(vec!["a.tif".to_string()]));
        assert_eq!(config.id_format, ItemIdFormat::DateTime);
        assert_eq!(config.bbox, None);

        let options = config.build_options();
        assert_eq!(options.base_url, "https://x.test/data");
        assert_eq!(options.asset_type_override, None);
        Ok(())
    }

    #[test]
    fn base_url_is_required() {
        for base_url in [None, Some("  ".to_string())] {
            let args = GenerateArgs {
                base_url,
                ..args_with_files()
            };
            assert!(matches!(
                GenerateConfig::resolve(args),
                Err(CliError::MissingBaseUrl)
            ));
        }
    }

    #[test]
    fn exactly_one_input_source() {
        let none = GenerateArgs {
            files: Vec::new(),
            ..args_with_files()
        };
        assert!(matches!(
            GenerateConfig::resolve(none),
            Err(CliError::MissingInput)
        ));

        let both = GenerateArgs {
            csv: Some(PathBuf::from("in.csv")),
            ..args_with_files()
        };
        match GenerateConfig::resolve(both) {
            Err(CliError::ConflictingInputs { sources }) => {
                assert_eq!(sources, "file paths, --csv");
            }
            other => panic!("expected conflicting inputs, got {other:?}"),
        }
    }

    #[test]
    fn bbox_must_be_finite() -> CliResult<()> {
        let ok = GenerateArgs {
            bbox: Some(vec![-10.0, -5.0, 10.0, 5.0]),
            ..args_with_files()
        };
        assert_eq!(
            GenerateConfig::resolve(ok)?.bbox,
            Some(BoundingBox::new(-10.0, -5.0, 10.0, 5.0))
        );

        let bad = GenerateArgs {
            bbox: Some(vec![0.0, 0.0, f64::NAN, 1.0]),
            ..args_with_files()
        };
        assert!(matches!(
            GenerateConfig::resolve(bad),
            Err(CliError::InvalidBbox { .. })
        ));
        Ok(())
    }

    #[test]
    fn id_format_and_overrides_flow_into_options() -> CliResult<()> {
        let args = GenerateArgs {
            id_format: Some(IdFormatArg::Date),
            asset_type: Some("application/x-custom".to_string()),
            style_url: Some("https://x.test/style.json".to_string()),
            json: Some(PathBuf::from("in.json")),
            files: Vec::new(),
            ..args_with_files()
        };
        let config = GenerateConfig::resolve(args)?;
        assert_eq!(config.input, InputSource::Json(PathBuf::from("in.json")));

        let options = config.build_options();
        assert_eq!(options.id_format, ItemIdFormat::Date);
        assert_eq!(
            options.asset_type_override.as_deref(),
            Some("application/x-custom")
        );
        assert_eq!(
            options.style_url.as_deref(),
            Some("https://x.test/style.json")
        );
        Ok(())
    }
}
