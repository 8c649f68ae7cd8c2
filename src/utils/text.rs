use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

/// Decomposes the text, drops the combining marks and lowercases what is left, so "Ñuñoa" and "nunoa" compare equal.
pub(crate) fn fold_for_search(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod test {

    use super::fold_for_search;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold_for_search("Ñuñoa"),"nunoa");
        assert_eq!(fold_for_search("VALPARAÍSO"),"valparaiso");
        assert_eq!(fold_for_search("Conceptio\u{0301}n"),"conception");
        assert_eq!(fold_for_search("plain"),"plain");
        assert_eq!(fold_for_search("Hà Nội"),"ha noi");
        assert_eq!(fold_for_search("Ǎ"),"a");
        assert_eq!(fold_for_search("Łódź"),"łodz");
    }
}
