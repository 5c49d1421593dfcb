use catedra_common::Department;

/// Resolve a free-text department name to a known department.
///
/// A department matches when its name contains the candidate or the candidate
/// contains its name, ignoring case. The first match in list order wins, so
/// `"algoritmos"` against `["Algoritmos I", "Algoritmos II"]` resolves to
/// `Algoritmos I` even though both contain it.
///
/// Surrounding whitespace is part of the comparison: `" bases"` does not
/// match `"Bases de Datos"`. A candidate that is blank after trimming matches
/// nothing, and departments with blank names are never matched.
pub fn resolve_department<'a>(
    candidate: &str,
    departments: &'a [Department],
) -> Option<&'a Department> {
    if candidate.trim().is_empty() {
        return None;
    }
    let candidate = candidate.to_lowercase();

    departments.iter().find(|dept| {
        if dept.name.trim().is_empty() {
            return false;
        }
        let name = dept.name.to_lowercase();
        name.contains(&candidate) || candidate.contains(&name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departments(names: &[&str]) -> Vec<Department> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Department {
                id: i as i64 + 1,
                code: format!("C{}", i + 1),
                name: name.to_string(),
                lead_instructor: String::new(),
                mentions: 0,
            })
            .collect()
    }

    #[test]
    fn first_department_in_list_order_wins() {
        let depts = departments(&["Algoritmos I", "Algoritmos II", "Bases de Datos"]);
        let matched = resolve_department("algoritmos", &depts).unwrap();
        assert_eq!(matched.name, "Algoritmos I");
    }

    #[test]
    fn list_order_decides_even_when_a_later_name_is_exact() {
        let depts = departments(&["Algoritmos I", "Algoritmos II"]);
        // "algoritmos ii" contains "algoritmos i", so the first entry wins.
        let matched = resolve_department("Algoritmos II", &depts).unwrap();
        assert_eq!(matched.name, "Algoritmos I");
    }

    #[test]
    fn candidate_containing_department_name_matches() {
        let depts = departments(&["Bases de Datos", "Redes"]);
        let matched = resolve_department("la cátedra de BASES DE DATOS de Ale", &depts).unwrap();
        assert_eq!(matched.id, 1);
    }

    #[test]
    fn department_name_containing_candidate_matches() {
        let depts = departments(&["Análisis Matemático II", "Física I"]);
        let matched = resolve_department("física", &depts).unwrap();
        assert_eq!(matched.name, "Física I");
    }

    #[test]
    fn unrelated_candidate_does_not_match() {
        let depts = departments(&["Bases de Datos"]);
        assert!(resolve_department("Redes", &depts).is_none());
    }

    #[test]
    fn blank_candidate_does_not_match() {
        let depts = departments(&["Bases de Datos"]);
        assert!(resolve_department("", &depts).is_none());
        assert!(resolve_department("   ", &depts).is_none());
    }

    #[test]
    fn blank_department_names_are_skipped() {
        let depts = departments(&["", "Redes"]);
        let matched = resolve_department("redes y sistemas", &depts).unwrap();
        assert_eq!(matched.name, "Redes");
    }

    #[test]
    fn whitespace_around_candidate_is_compared_verbatim() {
        let depts = departments(&["Bases de Datos", "Redes"]);
        assert!(resolve_department(" bases", &depts).is_none());
        assert!(resolve_department("datos ", &depts).is_none());
        // Inner whitespace shared with the name still matches.
        assert_eq!(resolve_department("bases de", &depts).unwrap().id, 1);
    }

    #[test]
    fn empty_department_list_never_matches() {
        assert!(resolve_department("Algoritmos", &[]).is_none());
    }
}
