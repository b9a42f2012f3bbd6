use crate::inventory::InstanceInfo;

/// True when any filter term is a substring of any tag's text.
///
/// Matching runs against the whole `{Key: .., Value: ..}` rendering, so a
/// term can hit a tag key as well as a value. It is case-sensitive.
pub fn matches_any(instance: &InstanceInfo, filters: &[String]) -> bool {
    let tag_texts: Vec<String> = instance.tags.iter().map(ToString::to_string).collect();

    filters
        .iter()
        .any(|filter| tag_texts.iter().any(|text| text.contains(filter.as_str())))
}

/// Instances matching at least one filter, in input order. No filters, no matches.
pub fn filter_instances(filters: &[String], instances: Vec<InstanceInfo>) -> Vec<InstanceInfo> {
    instances
        .into_iter()
        .filter(|instance| matches_any(instance, filters))
        .collect()
}
