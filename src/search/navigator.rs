//! Cursor arithmetic over an occurrence map.
//!
//! Every function here is total: an empty map (`total == 0`) always yields
//! index 0 and a `0/0` view. `max_results == 0` means no cap.

/// Number of occurrences the cursor may visit.
pub fn effective_bound(total: usize, max_results: usize) -> usize {
    if max_results > 0 {
        total.min(max_results)
    } else {
        total
    }
}

/// Next index, wrapping to 0 past the last visitable occurrence.
pub fn seek_forward(index: usize, total: usize, max_results: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let bound = effective_bound(total, max_results);
    if index >= bound - 1 {
        0
    } else {
        index + 1
    }
}

/// Previous index, wrapping from 0 to the last visitable occurrence.
pub fn seek_backward(index: usize, total: usize, max_results: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let bound = effective_bound(total, max_results);
    if index == 0 {
        bound - 1
    } else {
        index - 1
    }
}

/// Pull an index carried over from a previous map back into range.
pub fn reclamp(index: usize, total: usize, max_results: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let mut index = index.min(total - 1);
    if max_results > 0 && index >= max_results {
        index = max_results - 1;
    }
    index
}

/// 1-based index shown to the user, 0 when there is nothing to show.
pub fn viewable_index(index: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        index + 1
    }
}

pub fn viewable_total(total: usize, max_results: usize) -> usize {
    effective_bound(total, max_results)
}
