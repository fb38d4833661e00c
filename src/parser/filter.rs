/// Suffix-based exclusion of bundles, sides and condiments.
#[derive(Debug, Clone)]
pub struct ItemFilter {
    suffixes: Vec<String>,
}

impl ItemFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { suffixes }
    }

    /// True when the name ends with any excluded suffix, ignoring case. Names
    /// arrive trimmed from `candidates`.
    pub fn is_excluded(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn filter() -> ItemFilter {
        ItemFilter::new(&Settings::defaults().filter.excluded_suffixes)
    }

    #[test]
    fn excludes_boxes() {
        let f = filter();
        assert!(f.is_excluded("Crunchy Taco Box"));
        assert!(!f.is_excluded("Crunchy Taco"));
    }

    #[test]
    fn case_insensitive() {
        let f = filter();
        assert!(f.is_excluded("NACHO FRIES COMBO"));
        assert!(f.is_excluded("Mild Sauce Packet"));
        assert!(f.is_excluded("Taco Party Pack"));
        assert!(f.is_excluded("Chips and Guac Salsa"));
    }

    #[test]
    fn multi_word_suffixes() {
        let f = ItemFilter::new(["meal for 2"]);
        assert!(f.is_excluded("Cravings Meal for 2"));
        assert!(!f.is_excluded("Cravings Meal for 3"));
    }

    #[test]
    fn suffix_only_at_end() {
        let f = filter();
        assert!(!f.is_excluded("Boxed Burrito Supreme"));
        assert!(!f.is_excluded("Cheesy Gordita Crunch"));
    }

    #[test]
    fn matches_name_as_given() {
        let f = filter();
        assert!(f.is_excluded("Taco Box"));
        assert!(!f.is_excluded("Taco Box "));
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let f = ItemFilter::new(Vec::<String>::new());
        assert!(!f.is_excluded("Crunchy Taco Box"));
    }
}
