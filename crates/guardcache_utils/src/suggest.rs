/// Returns the candidate closest to `target` by edit distance, if any is
/// close enough to be a plausible typo.
///
/// Names shorter than three characters only accept a single edit.
pub fn suggest_name<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let threshold = if target.chars().count() < 3 { 1 } else { 3 };
    let mut best: Option<(usize, &str)> = None;

    for candidate in candidates {
        if candidate == target {
            continue;
        }
        let distance = edit_distance(target, candidate);
        if distance > threshold {
            continue;
        }
        // ties resolve to the lexicographically smaller name so the
        // suggestion does not depend on hash map iteration order
        let better = match best {
            None => true,
            Some((best_distance, best_name)) => {
                distance < best_distance || (distance == best_distance && candidate < best_name)
            }
        };
        if better {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, name)| name.to_string())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
