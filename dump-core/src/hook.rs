use crate::value::CellValue;

/// Optional per-cell transformation invoked before encoding (§4.7). The
/// hook receives the table, column, the raw cell, and the rest of the row
/// (already-hooked cells are not visible — the engine calls this once per
/// cell in column order, matching §4.6 field-by-field projection order).
///
/// It may change the value's type; subsequent encoding stays driven by the
/// column descriptor regardless — the hook cannot re-classify the column.
pub type RowHook = Box<dyn FnMut(&str, &str, CellValue, &[CellValue]) -> CellValue + Send>;

/// When no hook is installed this is a plain move, not a call through a
/// boxed closure — the no-allocation fast path design note 9 asks for.
pub fn apply(hook: Option<&mut RowHook>, table: &str, column: &str, value: CellValue, row: &[CellValue]) -> CellValue {
    match hook {
        Some(hook) => hook(table, column, value, row),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_path_returns_value_unchanged() {
        let v = CellValue::Raw(b"hello".to_vec());
        let out = apply(None, "t", "c", v.clone(), &[]);
        assert_eq!(out, v);
    }

    #[test]
    fn hook_can_rewrite_value() {
        let mut hook: RowHook = Box::new(|_table, column, _value, _row| {
            if column == "secret" {
                CellValue::Raw(b"***".to_vec())
            } else {
                CellValue::Null
            }
        });
        let out = apply(Some(&mut hook), "t", "secret", CellValue::Raw(b"xyz".to_vec()), &[]);
        assert_eq!(out, CellValue::Raw(b"***".to_vec()));
    }
}
