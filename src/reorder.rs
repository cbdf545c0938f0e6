// Ordered-list repositioning. Pure order computation: persistence of the
// resulting sequence is the store's job.

/// Move the element at `from` to position `to`, shifting everything between
/// (a standard array move, not a swap). Out-of-range `from` is a no-op;
/// `to` is clamped to the list bounds.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() {
        return out;
    }
    let to = to.min(out.len() - 1);
    let item = out.remove(from);
    out.insert(to, item);
    out
}

/// Single-step move toward the front; no-op at index 0
pub fn move_up<T: Clone>(list: &[T], index: usize) -> Vec<T> {
    if index == 0 {
        return list.to_vec();
    }
    reorder(list, index, index - 1)
}

/// Single-step move toward the back; no-op at the last index
pub fn move_down<T: Clone>(list: &[T], index: usize) -> Vec<T> {
    if list.is_empty() || index >= list.len() - 1 {
        return list.to_vec();
    }
    reorder(list, index, index + 1)
}
