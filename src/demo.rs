//! A short scripted walk through the map API.

use std::fmt;

use log::debug;

use crate::ChainedMap;

/// What [`run`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub count: usize,
    pub capacity: usize,
    pub contains_key1: bool,
    pub contains_key4: bool,
    pub value1: Option<String>,
    pub value4: Option<String>,
    /// Entries in iteration order before the removal.
    pub items: Vec<(String, String)>,
    pub count_after_remove: usize,
    pub contains_key2_after_remove: bool,
}

/// Inserts three pairs, looks up a present and a missing key, lists the
/// entries, then removes one of them.
///
/// # Examples
///
/// ```
/// let report = chain_map::demo::run();
/// assert_eq!(report.count, 3);
/// assert_eq!(report.count_after_remove, 2);
/// ```
pub fn run() -> DemoReport {
    let mut map = ChainedMap::<String, String>::new();
    for i in 1..=3 {
        map.insert(format!("chave{i}"), format!("valor{i}"));
    }

    let mut report = DemoReport {
        count: map.len(),
        capacity: map.capacity(),
        contains_key1: map.contains_key("chave1"),
        contains_key4: map.contains_key("chave4"),
        value1: map.get("chave1").cloned(),
        value4: map.get("chave4").cloned(),
        items: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        count_after_remove: 0,
        contains_key2_after_remove: false,
    };
    debug!("demo map before removal: {map:?}");

    map.remove("chave2");
    report.count_after_remove = map.len();
    report.contains_key2_after_remove = map.contains_key("chave2");
    report
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count: {}, capacity: {}", self.count, self.capacity)?;
        writeln!(f, "contains chave1: {}", self.contains_key1)?;
        writeln!(f, "contains chave4: {}", self.contains_key4)?;
        writeln!(f, "chave1 -> {:?}", self.value1)?;
        writeln!(f, "chave4 -> {:?}", self.value4)?;
        writeln!(f, "items:")?;
        for (k, v) in &self.items {
            writeln!(f, "  {k} = {v}")?;
        }
        writeln!(f, "after removing chave2:")?;
        writeln!(f, "  count: {}", self.count_after_remove)?;
        write!(f, "  contains chave2: {}", self.contains_key2_after_remove)
    }
}
