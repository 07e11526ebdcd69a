//! Filename-prefix classification

use super::DestinationGroup;

const PREFIX_LEN: usize = 6;

/// File a fragment into its group by the first six characters of its name.
///
/// Total: names that match no prefix, including names shorter than the
/// prefix, land in [`DestinationGroup::Uncategorized`].
pub fn classify(file_name: &str) -> DestinationGroup {
    let head: String = file_name.chars().take(PREFIX_LEN).collect();
    DestinationGroup::ALL
        .into_iter()
        .find(|group| group.prefix() == Some(head.as_str()))
        .unwrap_or(DestinationGroup::Uncategorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Differential-01-limits.tex", DestinationGroup::Differential)]
    #[case("Differ", DestinationGroup::Differential)]
    #[case("Integral-03-substitution.tex", DestinationGroup::Integral)]
    #[case("Integrals.tex", DestinationGroup::Integral)]
    #[case("Series-02-power.tex", DestinationGroup::Series)]
    #[case("series-02-power.tex", DestinationGroup::Uncategorized)]
    #[case("Appendix-01.tex", DestinationGroup::Uncategorized)]
    #[case("Diff", DestinationGroup::Uncategorized)]
    #[case("", DestinationGroup::Uncategorized)]
    #[case("微分-01.tex", DestinationGroup::Uncategorized)]
    fn classifies_by_prefix(#[case] name: &str, #[case] expected: DestinationGroup) {
        assert_eq!(classify(name), expected);
    }

    proptest! {
        #[test]
        fn prefixed_names_land_in_their_group(suffix in "\\PC{0,20}") {
            prop_assert_eq!(classify(&format!("Differ{}", suffix)), DestinationGroup::Differential);
            prop_assert_eq!(classify(&format!("Integr{}", suffix)), DestinationGroup::Integral);
            prop_assert_eq!(classify(&format!("Series{}", suffix)), DestinationGroup::Series);
        }

        #[test]
        fn other_names_are_uncategorized(name in "[a-z0-9 _-]{0,20}") {
            prop_assert_eq!(classify(&name), DestinationGroup::Uncategorized);
        }
    }
}
