//! 把多回合的樣本聚合成每頁每欄一個值

use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    #[default]
    Median,
    Average,
}

impl ScoreMethod {
    pub fn reduce(&self, samples: &[f64]) -> Result<f64> {
        match self {
            ScoreMethod::Median => Ok(median(samples)),
            ScoreMethod::Average => average(samples),
        }
    }
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMethod::Median => write!(f, "median"),
            ScoreMethod::Average => write!(f, "average"),
        }
    }
}

impl FromStr for ScoreMethod {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(ScoreMethod::Median),
            "average" => Ok(ScoreMethod::Average),
            other => Err(BatchError::InvalidConfigValueError {
                field: "method".to_string(),
                value: other.to_string(),
                reason: "Valid methods: median, average".to_string(),
            }),
        }
    }
}

/// 平均後四捨五入；空序列回傳錯誤而不是 NaN
pub fn average(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(BatchError::EmptySamples);
    }
    let sum: f64 = samples.iter().sum();
    Ok((sum / samples.len() as f64).round())
}

/// 中位數；偶數個時取中間兩個的平均（不四捨五入）。空序列回傳 0
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    // 不改動呼叫端的順序
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        // 空序列的中位數定義為 0
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[5.0]), 5.0);
        // 偶數個取中間兩個的平均
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_median_within_bounds() {
        let inputs: [&[f64]; 4] = [
            &[7.0, 7.0, 7.0],
            &[100.0, 1.0],
            &[42.0, 13.0, 99.0, 54.0, 3.0],
            &[10.0, 90.0, 20.0, 80.0, 30.0, 70.0],
        ];
        for samples in inputs {
            let value = median(samples);
            let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(value >= min && value <= max, "{:?} -> {}", samples, value);
        }
    }

    #[test]
    fn test_average() {
        // 2.5 四捨五入為 3
        assert_eq!(average(&[2.0, 3.0]).unwrap(), 3.0);
        assert_eq!(average(&[10.0]).unwrap(), 10.0);
        assert_eq!(average(&[60.0, 80.0, 91.0]).unwrap(), 77.0);
    }

    #[test]
    fn test_average_empty_is_error() {
        assert!(matches!(average(&[]), Err(BatchError::EmptySamples)));
        assert!(ScoreMethod::Average.reduce(&[]).is_err());
        assert_eq!(ScoreMethod::Median.reduce(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("Median".parse::<ScoreMethod>().unwrap(), ScoreMethod::Median);
        assert_eq!("average".parse::<ScoreMethod>().unwrap(), ScoreMethod::Average);
        assert!("mode".parse::<ScoreMethod>().is_err());
    }
}
