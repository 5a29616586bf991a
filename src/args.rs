use crate::data::{CitySource, DemoSource, FileSource, HttpSource, RouteSource};
use crate::model::ZoneFilter;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal travel-safety map
#[derive(Parser, Debug)]
#[command(name = "safemap", version, about)]
pub struct Args {
    /// Directory holding cities.json and routes.json
    #[arg(long, env = "SAFEMAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the travel-safety API; takes precedence over --data-dir
    #[arg(long, env = "SAFEMAP_API_URL")]
    pub api_url: Option<String>,

    /// GeoJSON file drawn as the background map
    #[arg(long, env = "SAFEMAP_BASEMAP")]
    pub basemap: Option<PathBuf>,

    /// Initial zone filter: all, green, orange or red
    #[arg(long, default_value = "all", value_parser = parse_zone_filter)]
    pub zone: ZoneFilter,

    /// Draw a zone circle around every city
    #[arg(long)]
    pub zone_circles: bool,

    /// Hide the zone legend
    #[arg(long)]
    pub no_legend: bool,

    /// Log file; the terminal is owned by the UI
    #[arg(long, default_value = "safemap.log")]
    pub log_file: PathBuf,
}

fn parse_zone_filter(s: &str) -> Result<ZoneFilter, String> {
    match ZoneFilter::parse(s) {
        ZoneFilter::Only(crate::model::Zone::Unknown) => Err(format!("unknown zone '{s}' (expected all, green, orange or red)")),
        filter => Ok(filter),
    }
}

impl Args {
    /// City and route sources: API, then data directory, then the demo set
    pub fn sources(&self) -> Result<(Arc<dyn CitySource>, Arc<dyn RouteSource>)> {
        if let Some(url) = &self.api_url {
            let source = Arc::new(HttpSource::new(url)?);
            tracing::info!(%url, "using API source");
            return Ok(split(source));
        }
        if let Some(dir) = &self.data_dir {
            tracing::info!(dir = %dir.display(), "using file source");
            return Ok(split(Arc::new(FileSource::new(dir))));
        }
        tracing::info!("using built-in demo cities");
        Ok(split(Arc::new(DemoSource::new())))
    }
}

fn split<S: CitySource + RouteSource + 'static>(source: Arc<S>) -> (Arc<dyn CitySource>, Arc<dyn RouteSource>) {
    (source.clone(), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Zone;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["safemap"]).unwrap();
        assert_eq!(args.zone, ZoneFilter::All);
        assert!(!args.zone_circles);
        assert_eq!(args.log_file, PathBuf::from("safemap.log"));
    }

    #[test]
    fn test_zone_flag() {
        let args = Args::try_parse_from(["safemap", "--zone", "red", "--zone-circles"]).unwrap();
        assert_eq!(args.zone, ZoneFilter::Only(Zone::HighRisk));
        assert!(args.zone_circles);
        assert!(Args::try_parse_from(["safemap", "--zone", "purple"]).is_err());
    }
}
