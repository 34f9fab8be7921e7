use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use evopedia::geometry::{Point, Rectangle};

use super::{Command, ShellState};
use crate::print_line;

pub struct GeoCommand;

#[async_trait]
impl Command for GeoCommand {
    fn name(&self) -> &str {
        "geo"
    }

    fn usage(&self) -> &str {
        "geo MIN_LON MIN_LAT MAX_LON MAX_LAT [MAX_TITLES] - search a rectangle"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.len() < 4 {
            return Err(anyhow!("usage: {}", self.usage()));
        }

        let nums: Result<Vec<f64>, _> = args[..4].iter().map(|s| s.parse::<f64>()).collect();
        let nums = nums.map_err(|e| anyhow!("invalid coordinate: {e}"))?;
        let (min_lon, min_lat, max_lon, max_lat) = (nums[0], nums[1], nums[2], nums[3]);
        let max_titles = args.get(4).and_then(|s| s.parse::<i64>().ok()).unwrap_or(-1);

        let rect = Rectangle::from_corners(Point::new(min_lon, min_lat), Point::new(max_lon, max_lat));

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner} searching...")?);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));

        let result = state.archive().get_titles_in_coords(rect, max_titles).await;
        spinner.finish_and_clear();

        let titles = result?;
        if titles.is_empty() {
            print_line!("{}", "no titles in range".yellow());
        }
        for t in titles {
            print_line!("  {}", t.name());
        }
        Ok(())
    }
}
