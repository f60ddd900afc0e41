//! Partition a cluster by municipality.

use crate::model::PositiveCase;

/// Cases of one municipality within a cluster
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityGroup {
    pub municipality_id: String,
    pub cases: Vec<PositiveCase>,
}

/// Group cases by `municipality_id`, groups in first-seen order and cases
/// in their original order within each group.
pub fn group_by_municipality(cases: Vec<PositiveCase>) -> Vec<MunicipalityGroup> {
    let mut groups: Vec<MunicipalityGroup> = Vec::new();
    for case in cases {
        match groups
            .iter_mut()
            .find(|g| g.municipality_id == case.municipality_id)
        {
            Some(group) => group.cases.push(case),
            None => groups.push(MunicipalityGroup {
                municipality_id: case.municipality_id.clone(),
                cases: vec![case],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;
    use chrono::Utc;

    fn case(id: &str, municipality: &str) -> PositiveCase {
        PositiveCase {
            id: id.to_string(),
            test_date: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            age: 25,
            sex: Sex::F,
            municipality_id: municipality.to_string(),
        }
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let cases = vec![
            case("a", "200"),
            case("b", "100"),
            case("c", "200"),
            case("d", "300"),
            case("e", "100"),
        ];
        let groups = group_by_municipality(cases);

        let ids: Vec<&str> = groups.iter().map(|g| g.municipality_id.as_str()).collect();
        assert_eq!(ids, vec!["200", "100", "300"]);

        let first: Vec<&str> = groups[0].cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(first, vec!["a", "c"]);
        let second: Vec<&str> = groups[1].cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(second, vec!["b", "e"]);
    }

    #[test]
    fn test_no_empty_groups() {
        let groups = group_by_municipality(vec![case("a", "1"), case("b", "1")]);
        assert_eq!(groups.len(), 1);
        assert!(groups.iter().all(|g| !g.cases.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_municipality(Vec::new()).is_empty());
    }
}
