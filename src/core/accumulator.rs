//! 跨回合累積每個頁面的樣本

use crate::domain::model::{to_percent, AuditScore, CategoryScore, PageRow, VITAL_METRICS};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 單一頁面單一欄位的樣本，依回合順序
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    pub key: String,
    pub title: String,
    pub samples: Vec<T>,
}

/// 單一 audit 最近一次的分數，不做累積
#[derive(Debug, Clone, PartialEq)]
pub struct LatestScore {
    pub id: String,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageAccumulator {
    pub page_index: usize,
    pub metadata: PageRow,
    /// 百分制分類分數，依首次出現順序
    pub scores: Vec<Series<u32>>,
    pub metrics: Option<Vec<Series<f64>>>,
    pub audits: Option<Vec<LatestScore>>,
}

impl PageAccumulator {
    fn new(page_index: usize, metadata: PageRow) -> Self {
        Self {
            page_index,
            metadata,
            scores: Vec::new(),
            metrics: None,
            audits: None,
        }
    }

    pub fn score(&self, key: &str) -> Option<&Series<u32>> {
        self.scores.iter().find(|series| series.key == key)
    }

    pub fn metric(&self, key: &str) -> Option<&Series<f64>> {
        self.metrics
            .as_ref()
            .and_then(|metrics| metrics.iter().find(|series| series.key == key))
    }

    pub fn audit(&self, id: &str) -> Option<&LatestScore> {
        self.audits
            .as_ref()
            .and_then(|audits| audits.iter().find(|audit| audit.id == id))
    }

    /// 所有分類都沒有可用樣本
    pub fn has_no_scores(&self) -> bool {
        self.scores.iter().all(|series| series.samples.is_empty())
    }
}

fn series_mut<'a, T>(list: &'a mut Vec<Series<T>>, key: &str, title: &str) -> &'a mut Series<T> {
    let position = match list.iter().position(|series| series.key == key) {
        Some(position) => position,
        None => {
            list.push(Series {
                key: key.to_string(),
                title: title.to_string(),
                samples: Vec::new(),
            });
            list.len() - 1
        }
    };
    &mut list[position]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardKind {
    Category,
    Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// 分數為 0（或四捨五入後為 0）
    Zero,
    /// Lighthouse 回報 `score: null`
    Unscored,
}

/// 被丟棄的樣本，交由呼叫端寫入錯誤紀錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discard {
    pub page_index: usize,
    pub kind: DiscardKind,
    pub reason: DiscardReason,
    pub key: String,
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiscardKind::Category => "category",
            DiscardKind::Metric => "metric",
        };
        let reason = match self.reason {
            DiscardReason::Zero => "has a zero score",
            DiscardReason::Unscored => "was not scored",
        };
        write!(
            f,
            "{} '{}' {} on page {}; sample discarded",
            kind,
            self.key,
            reason,
            self.page_index + 1
        )
    }
}

#[derive(Debug, Default)]
pub struct Accumulator {
    pages: BTreeMap<usize, PageAccumulator>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄某頁面一個回合的結果。0 分或沒有分數的樣本不會加入，
    /// 而是回傳給呼叫端寫入錯誤紀錄；每個分類與指標各自判斷。
    pub fn record(
        &mut self,
        page_index: usize,
        metadata: &PageRow,
        categories: &[CategoryScore],
        metrics: Option<&HashMap<String, f64>>,
        audits: Option<&[AuditScore]>,
    ) -> Vec<Discard> {
        let page = self
            .pages
            .entry(page_index)
            .or_insert_with(|| PageAccumulator::new(page_index, metadata.clone()));
        let mut discarded = Vec::new();

        for category in categories {
            let series = series_mut(&mut page.scores, &category.id, &category.title);
            let reason = match category.score.map(to_percent) {
                Some(score) if score > 0 => {
                    series.samples.push(score);
                    continue;
                }
                Some(_) => DiscardReason::Zero,
                None => DiscardReason::Unscored,
            };
            discarded.push(Discard {
                page_index,
                kind: DiscardKind::Category,
                reason,
                key: category.id.clone(),
            });
        }

        if let Some(values) = metrics {
            let page_metrics = page.metrics.get_or_insert_with(Vec::new);
            for id in VITAL_METRICS {
                let Some(&value) = values.get(id) else {
                    continue;
                };
                let series = series_mut(page_metrics, id, id);
                if value == 0.0 {
                    discarded.push(Discard {
                        page_index,
                        kind: DiscardKind::Metric,
                        reason: DiscardReason::Zero,
                        key: id.to_string(),
                    });
                } else {
                    series.samples.push(value);
                }
            }
        }

        if let Some(scores) = audits {
            let latest = page.audits.get_or_insert_with(Vec::new);
            for audit in scores {
                let Some(score) = audit.score else {
                    continue;
                };
                match latest.iter_mut().find(|entry| entry.id == audit.id) {
                    Some(entry) => entry.score = score,
                    None => latest.push(LatestScore {
                        id: audit.id.clone(),
                        title: audit.title.clone(),
                        score,
                    }),
                }
            }
        }

        discarded
    }

    /// 至少有一次觀測的頁面，依輸入順序
    pub fn pages(&self) -> impl Iterator<Item = &PageAccumulator> {
        self.pages.values()
    }

    pub fn page(&self, page_index: usize) -> Option<&PageAccumulator> {
        self.pages.get(&page_index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
