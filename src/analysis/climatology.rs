/// Seasonal/diurnal climatology of the hourly regional trace.
///
/// Every hourly sample is classified into one (season, hour-of-day) cell.
/// The climatology table holds the mean of each cell; normalization divides
/// each sample by its cell mean, leaving a deseasonalized unit-mean trace.
///
/// Classification uses UTC calendar dates and hours throughout, the same
/// zone timestamps are normalized to at ingestion.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::model::{Cell, HOURS_PER_DAY, ModelError, SEASON_COUNT, Season, Stage, TimeSeries};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// First (month, day) of each season; a season runs until the next one starts.
const SPRING_START: (u32, u32) = (3, 20);
const SUMMER_START: (u32, u32) = (6, 21);
const FALL_START: (u32, u32) = (9, 23);
const WINTER_START: (u32, u32) = (12, 22);

/// Season of a UTC instant.
///
/// Spring is Mar 20 to Jun 20, summer Jun 21 to Sep 22, fall Sep 23 to
/// Dec 21; everything else, across the new year, is winter.
pub fn season_of(time: DateTime<Utc>) -> Season {
    let day = (time.month(), time.day());
    if day >= SPRING_START && day < SUMMER_START {
        Season::Spring
    } else if day >= SUMMER_START && day < FALL_START {
        Season::Summer
    } else if day >= FALL_START && day < WINTER_START {
        Season::Fall
    } else {
        Season::Winter
    }
}

/// The climatology cell a UTC instant belongs to.
pub fn classify(time: DateTime<Utc>) -> Cell {
    Cell {
        season: season_of(time),
        hour: time.hour(),
    }
}

// ---------------------------------------------------------------------------
// Climatology table
// ---------------------------------------------------------------------------

/// Per-cell sums and counts of an hourly trace, 4 seasons x 24 hours.
///
/// A cell that received no samples has no mean.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyTable {
    sums: [[f64; HOURS_PER_DAY]; SEASON_COUNT],
    counts: [[usize; HOURS_PER_DAY]; SEASON_COUNT],
}

impl ClimatologyTable {
    /// Builds the table in one pass over an hourly trace.
    pub fn estimate(hourly: &TimeSeries) -> Result<Self, ModelError> {
        if hourly.is_empty() {
            return Err(ModelError::EmptyInput { stage: Stage::Climatology });
        }

        let mut table = Self {
            sums: [[0.0; HOURS_PER_DAY]; SEASON_COUNT],
            counts: [[0; HOURS_PER_DAY]; SEASON_COUNT],
        };
        for sample in hourly {
            let cell = classify(sample.time);
            let (s, h) = (cell.season.index(), cell.hour as usize);
            table.sums[s][h] += sample.value;
            table.counts[s][h] += 1;
        }
        Ok(table)
    }

    /// Number of samples that fell into `cell`.
    pub fn count(&self, cell: Cell) -> usize {
        self.counts[cell.season.index()][cell.hour as usize]
    }

    /// Arithmetic mean of `cell`, or `None` if the cell is empty.
    pub fn mean(&self, cell: Cell) -> Option<f64> {
        let (s, h) = (cell.season.index(), cell.hour as usize);
        match self.counts[s][h] {
            0 => None,
            n => Some(self.sums[s][h] / n as f64),
        }
    }

    /// All cells in table order: seasons in `Season::ALL` order, hours 0..24.
    pub fn cells() -> impl Iterator<Item = Cell> {
        Season::ALL.into_iter().flat_map(|season| {
            (0..HOURS_PER_DAY as u32).map(move |hour| Cell { season, hour })
        })
    }

    pub fn is_complete(&self) -> bool {
        Self::cells().all(|cell| self.count(cell) > 0)
    }

    /// Fails with `EmptyBucket` on the first cell without samples.
    pub fn require_complete(&self) -> Result<(), ModelError> {
        match Self::cells().find(|cell| self.count(*cell) == 0) {
            Some(cell) => Err(ModelError::EmptyBucket {
                stage: Stage::Climatology,
                season: cell.season,
                hour: cell.hour,
            }),
            None => Ok(()),
        }
    }

    /// Means of one season's 24 hours.
    pub fn season_means(&self, season: Season) -> [Option<f64>; HOURS_PER_DAY] {
        let mut row = [None; HOURS_PER_DAY];
        for (hour, slot) in row.iter_mut().enumerate() {
            *slot = self.mean(Cell { season, hour: hour as u32 });
        }
        row
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Divides every hourly sample by the climatology mean of its cell.
///
/// Fails with `EmptyBucket` if a sample's cell has no mean and with
/// `ZeroClimatology` if the mean is zero; neither is replaced by a default.
pub fn normalize(hourly: &TimeSeries, table: &ClimatologyTable) -> Result<TimeSeries, ModelError> {
    let mut normalized = TimeSeries::with_capacity(hourly.len());
    for sample in hourly {
        let cell = classify(sample.time);
        let mean = table.mean(cell).ok_or(ModelError::EmptyBucket {
            stage: Stage::Normalize,
            season: cell.season,
            hour: cell.hour,
        })?;
        if mean == 0.0 {
            return Err(ModelError::ZeroClimatology {
                season: cell.season,
                hour: cell.hour,
            });
        }
        normalized.push(sample.time, sample.value / mean);
    }
    Ok(normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2006, month, day, hour, 0, 0).unwrap()
    }

    fn hourly_from(start: DateTime<Utc>, values: &[f64]) -> TimeSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::hours(i as i64), *v))
            .collect()
    }

    // --- Season boundaries --------------------------------------------------

    #[test]
    fn test_season_start_days_are_inclusive() {
        assert_eq!(season_of(at(3, 20, 0)), Season::Spring);
        assert_eq!(season_of(at(6, 21, 0)), Season::Summer);
        assert_eq!(season_of(at(9, 23, 0)), Season::Fall);
        assert_eq!(season_of(at(12, 22, 0)), Season::Winter);
    }

    #[test]
    fn test_day_before_season_start_belongs_to_previous_season() {
        assert_eq!(season_of(at(3, 19, 23)), Season::Winter);
        assert_eq!(season_of(at(6, 20, 23)), Season::Spring);
        assert_eq!(season_of(at(9, 22, 23)), Season::Summer);
        assert_eq!(season_of(at(12, 21, 23)), Season::Fall);
    }

    #[test]
    fn test_winter_wraps_the_new_year() {
        assert_eq!(season_of(at(12, 31, 12)), Season::Winter);
        assert_eq!(season_of(at(1, 1, 0)), Season::Winter);
        assert_eq!(season_of(at(2, 28, 0)), Season::Winter);
    }

    #[test]
    fn test_classify_uses_utc_hour() {
        let cell = classify(at(7, 4, 17));
        assert_eq!(cell, Cell { season: Season::Summer, hour: 17 });
    }

    // --- Table ----------------------------------------------------------------

    #[test]
    fn test_cell_mean_is_sum_over_count() {
        // Three days of hourly data in spring; hour h on day d is h + 10*d.
        let values: Vec<f64> = (0..72).map(|i| (i % 24) as f64 + 10.0 * (i / 24) as f64).collect();
        let hourly = hourly_from(at(4, 1, 0), &values);
        let table = ClimatologyTable::estimate(&hourly).unwrap();

        for hour in 0..24u32 {
            let cell = Cell { season: Season::Spring, hour };
            let expected = (hour as f64 + (hour as f64 + 10.0) + (hour as f64 + 20.0)) / 3.0;
            assert_eq!(table.count(cell), 3);
            assert_eq!(table.mean(cell), Some(expected));
        }
    }

    #[test]
    fn test_empty_cells_have_no_mean() {
        let hourly = hourly_from(at(4, 1, 0), &[5.0; 24]);
        let table = ClimatologyTable::estimate(&hourly).unwrap();

        assert_eq!(table.mean(Cell { season: Season::Winter, hour: 0 }), None);
        assert!(!table.is_complete());
        assert_eq!(
            table.require_complete(),
            Err(ModelError::EmptyBucket { stage: Stage::Climatology, season: Season::Summer, hour: 0 })
        );
    }

    #[test]
    fn test_season_means_row_has_every_hour() {
        let hourly = hourly_from(at(10, 1, 0), &[2.0; 48]);
        let table = ClimatologyTable::estimate(&hourly).unwrap();
        let row = table.season_means(Season::Fall);
        assert!(row.iter().all(|m| *m == Some(2.0)));
        assert!(table.season_means(Season::Spring).iter().all(|m| m.is_none()));
    }

    #[test]
    fn test_estimate_rejects_empty_trace() {
        assert_eq!(
            ClimatologyTable::estimate(&TimeSeries::new()),
            Err(ModelError::EmptyInput { stage: Stage::Climatology })
        );
    }

    // --- Normalization --------------------------------------------------------

    #[test]
    fn test_trace_equal_to_its_climatology_normalizes_to_one() {
        let values: Vec<f64> = (0..96).map(|i| 40.0 + (i % 24) as f64).collect();
        let hourly = hourly_from(at(1, 10, 0), &values);
        let table = ClimatologyTable::estimate(&hourly).unwrap();
        let normalized = normalize(&hourly, &table).unwrap();

        assert_eq!(normalized.len(), hourly.len());
        assert!(normalized.iter().all(|s| s.value == 1.0));
    }

    #[test]
    fn test_normalize_divides_by_cell_mean() {
        let hourly = hourly_from(at(8, 1, 6), &[2.0]);
        let mut twice = hourly.clone();
        twice.push(at(8, 2, 6), 6.0);
        let table = ClimatologyTable::estimate(&twice).unwrap();

        let normalized = normalize(&twice, &table).unwrap();
        assert_eq!(normalized.values(), vec![0.5, 1.5]);
    }

    #[test]
    fn test_normalize_fails_on_cell_missing_from_table() {
        let table = ClimatologyTable::estimate(&hourly_from(at(4, 1, 0), &[1.0; 24])).unwrap();
        let winter = hourly_from(at(1, 5, 3), &[1.0]);
        assert_eq!(
            normalize(&winter, &table),
            Err(ModelError::EmptyBucket { stage: Stage::Normalize, season: Season::Winter, hour: 3 })
        );
    }

    #[test]
    fn test_normalize_fails_on_zero_mean() {
        let hourly = hourly_from(at(4, 1, 0), &[0.0, 1.0]);
        let table = ClimatologyTable::estimate(&hourly).unwrap();
        assert_eq!(
            normalize(&hourly, &table),
            Err(ModelError::ZeroClimatology { season: Season::Spring, hour: 0 })
        );
    }
}
