#[cfg(test)]
mod tests {
    use crate::data_layout::layout;
    use crate::data_layout::symbol_table::SymbolKind;
    use crate::error::ErrorKind;
    use crate::parser::ast::{Binding, SizeRef};

    #[test]
    fn empty_bindings_produce_no_words() {
        let result = layout(&[]).unwrap();
        assert!(result.words.is_empty());
        assert!(result.symbol_table.is_empty());
    }

    #[test]
    fn const_reserves_one_word_with_its_value() {
        let bindings = vec![Binding::Const { name: "LIMIT".into(), value: 10 }];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.words, vec![10]);
        let entry = result.symbol_table.get("LIMIT").unwrap();
        assert_eq!(entry.kind, SymbolKind::Const);
        assert_eq!(entry.addr, 0);
        assert_eq!(entry.value, Some(10));
    }

    #[test]
    fn string_uses_pascal_layout() {
        let bindings = vec![Binding::StringLit { name: "greet".into(), text: "hi".into() }];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.words, vec![2, 'h' as u32, 'i' as u32]);
        let entry = result.symbol_table.get("greet").unwrap();
        assert_eq!(entry.addr, 0);
        assert_eq!(entry.size, 3);
    }

    #[test]
    fn variable_reserves_one_zero_word() {
        let bindings = vec![Binding::Variable { name: "counter".into() }];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.words, vec![0]);
    }

    #[test]
    fn alloc_with_literal_size() {
        let bindings = vec![Binding::Alloc { name: "buf".into(), size: SizeRef::Literal(4) }];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.words, vec![0, 0, 0, 0]);
    }

    #[test]
    fn alloc_with_const_ref_size() {
        let bindings = vec![
            Binding::Const { name: "N".into(), value: 3 },
            Binding::Alloc { name: "buf".into(), size: SizeRef::ConstRef("N".into()) },
        ];
        let result = layout(&bindings).unwrap();
        // word 0 is the const's own reserved slot, then 3 zero words for alloc
        assert_eq!(result.words, vec![3, 0, 0, 0]);
        let entry = result.symbol_table.get("buf").unwrap();
        assert_eq!(entry.addr, 1);
        assert_eq!(entry.size, 3);
    }

    #[test]
    fn phases_reorder_regardless_of_source_order() {
        // alloc appears before its const in source order but the const
        // phase still runs first, so resolution succeeds.
        let bindings = vec![
            Binding::Alloc { name: "buf".into(), size: SizeRef::ConstRef("N".into()) },
            Binding::Const { name: "N".into(), value: 2 },
        ];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.words, vec![2, 0, 0]);
    }

    #[test]
    fn alloc_referencing_unknown_const_is_fatal() {
        let bindings = vec![Binding::Alloc { name: "buf".into(), size: SizeRef::ConstRef("MISSING".into()) }];
        let err = layout(&bindings).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAllocSize);
    }

    #[test]
    fn duplicate_name_across_phases_is_fatal() {
        let bindings = vec![
            Binding::Const { name: "x".into(), value: 1 },
            Binding::Variable { name: "x".into() },
        ];
        let err = layout(&bindings).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);
    }

    #[test]
    fn duplicate_name_within_same_phase_is_fatal() {
        let bindings =
            vec![Binding::Variable { name: "x".into() }, Binding::Variable { name: "x".into() }];
        let err = layout(&bindings).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);
    }

    #[test]
    fn addresses_strictly_increase_in_phase_order() {
        let bindings = vec![
            Binding::Const { name: "c".into(), value: 1 },
            Binding::StringLit { name: "s".into(), text: "ab".into() },
            Binding::Variable { name: "v".into() },
            Binding::Alloc { name: "a".into(), size: SizeRef::Literal(2) },
        ];
        let result = layout(&bindings).unwrap();
        assert_eq!(result.symbol_table.resolve_addr("c"), Some(0));
        assert_eq!(result.symbol_table.resolve_addr("s"), Some(1));
        assert_eq!(result.symbol_table.resolve_addr("v"), Some(4));
        assert_eq!(result.symbol_table.resolve_addr("a"), Some(5));
    }
}
