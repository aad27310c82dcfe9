/// Picks a collision-free id for a copy of `base`:
/// `Omega` -> `Omega_Copy` -> `Omega_Copy2` -> `Omega_Copy3` ...
pub fn make_unique_name(base: &str, exists: impl Fn(&str) -> bool) -> String {
    let base = match base.trim() {
        "" => "Item",
        b => b,
    };
    let candidate = format!("{base}_Copy");
    if !exists(&candidate) {
        return candidate;
    }
    (2u64..)
        .map(|i| format!("{base}_Copy{i}"))
        .find(|c| !exists(c))
        .unwrap_or_else(|| format!("{base}_Copy"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn first_copy_then_numbered() {
        let mut taken: HashSet<String> = HashSet::new();
        assert_eq!(make_unique_name("Omega", |s| taken.contains(s)), "Omega_Copy");
        taken.insert("Omega_Copy".into());
        assert_eq!(make_unique_name("Omega", |s| taken.contains(s)), "Omega_Copy2");
        taken.insert("Omega_Copy2".into());
        assert_eq!(make_unique_name(" Omega ", |s| taken.contains(s)), "Omega_Copy3");
    }

    #[test]
    fn blank_base_uses_item() {
        assert_eq!(make_unique_name("   ", |_| false), "Item_Copy");
    }
}
