use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: i64,
}

/// Case-folds every keyword, counts occurrences across all lists and keeps the
/// `limit` most frequent. Equal counts are ordered alphabetically.
pub fn rank_keywords<'a, I, L>(lists: I, limit: usize) -> Vec<KeywordCount>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = &'a String>,
{
    let mut counts: HashMap<String, i64> = HashMap::new();
    lists.into_iter().flatten().for_each(|keyword| {
        *counts.entry(keyword.to_lowercase()).or_default() += 1;
    });

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    ranked.truncate(limit);

    ranked
}
