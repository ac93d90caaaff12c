#[cfg(test)]
mod tests {
    use crate::codegen::compile;
    use crate::error::ErrorKind;
    use crate::isa::{AddrMode, Opcode};
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile_ok(src: &str) -> crate::codegen::CodegenResult {
        let lexed = tokenize(src);
        assert!(lexed.errors.is_empty(), "lexer errors: {:?}", lexed.errors);
        let program = parse(&lexed.tokens).expect("expected parse to succeed");
        compile(&program).expect("expected codegen to succeed")
    }

    fn compile_err(src: &str) -> ErrorKind {
        let lexed = tokenize(src);
        assert!(lexed.errors.is_empty(), "lexer errors: {:?}", lexed.errors);
        let program = parse(&lexed.tokens).expect("expected parse to succeed");
        compile(&program).expect_err("expected codegen to fail").kind
    }

    #[test]
    fn empty_program_ends_in_halt() {
        let result = compile_ok("");
        assert_eq!(result.instructions.last().unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn entry_jump_is_patched_to_a_real_address() {
        let result = compile_ok("1 2 +");
        let entry_jump = &result.instructions[0];
        assert_eq!(entry_jump.opcode, Opcode::Jmp);
        assert!(entry_jump.imm.unwrap() > 0);
    }

    #[test]
    fn number_literal_lowers_to_push_imm() {
        let result = compile_ok("42");
        let push = result
            .instructions
            .iter()
            .find(|r| r.opcode == Opcode::PushDs && r.rs1_addr_t == Some(AddrMode::Imm))
            .expect("expected a push_ds #imm");
        assert_eq!(push.imm, Some(42));
    }

    #[test]
    fn unknown_word_is_fatal() {
        assert_eq!(compile_err("frobnicate"), ErrorKind::UnknownWord);
    }

    #[test]
    fn const_reference_pushes_its_value() {
        let result = compile_ok("const LIMIT 10\nLIMIT");
        let push = result
            .instructions
            .iter()
            .rev()
            .find(|r| r.opcode == Opcode::PushDs && r.rs1_addr_t == Some(AddrMode::Imm))
            .unwrap();
        assert_eq!(push.imm, Some(10));
    }

    #[test]
    fn variable_reference_pushes_its_address() {
        let result = compile_ok("var counter\ncounter");
        let addr = result.symbol_table.resolve_addr("counter").unwrap();
        let push = result
            .instructions
            .iter()
            .rev()
            .find(|r| r.opcode == Opcode::PushDs && r.rs1_addr_t == Some(AddrMode::Imm))
            .unwrap();
        assert_eq!(push.imm, Some(addr as i64));
    }

    #[test]
    fn procedure_call_pushes_return_address_then_jumps() {
        let result = compile_ok(": noop ; noop");
        let jmp_count = result.instructions.iter().filter(|r| r.opcode == Opcode::Jmp).count();
        // entry jump + the call to `noop`
        assert_eq!(jmp_count, 2);
        let push_rs = result
            .instructions
            .iter()
            .find(|r| r.opcode == Opcode::PushRs && r.rs1_addr_t == Some(AddrMode::Imm))
            .expect("expected a push_rs #imm for the call");
        assert!(push_rs.imm.unwrap() > 0);
    }

    #[test]
    fn duplicate_procedure_name_is_fatal() {
        assert_eq!(compile_err(": dup2 dup dup ;\n: dup2 drop ;"), ErrorKind::DuplicateName);
    }

    #[test]
    fn if_then_emits_a_conditional_jump() {
        let result = compile_ok("1 if 2 then");
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Cmp));
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Jeq));
    }

    #[test]
    fn comparison_pushes_boolean_sentinel() {
        let result = compile_ok("1 2 =");
        let pushed_values: Vec<_> = result
            .instructions
            .iter()
            .filter(|r| r.opcode == Opcode::PushDs && r.rs1_addr_t == Some(AddrMode::Imm))
            .filter_map(|r| r.imm)
            .collect();
        assert!(pushed_values.contains(&0));
        assert!(pushed_values.contains(&-1));
    }

    #[test]
    fn begin_until_loops_back_to_its_own_start() {
        let result = compile_ok("begin dup until");
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Jeq));
    }

    #[test]
    fn times_next_decrements_and_loops() {
        let result = compile_ok("3 times dup next");
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Sub));
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Jgt));
    }

    #[test]
    fn print_string_emits_one_out_per_character() {
        // the delimiter space between `."` and the opening quote is not
        // part of the string, so this prints exactly "hi".
        let result = compile_ok(".\" hi\"");
        let out_count = result.instructions.iter().filter(|r| r.opcode == Opcode::Out).count();
        assert_eq!(out_count, 2);
    }

    #[test]
    fn print_string_without_operand_is_fatal() {
        // constructing this directly through source isn't possible since the
        // parser always pairs '."' with a following Str; this exercises the
        // guard in gen_body defensively via a definition whose body the
        // parser still produces correctly paired, just checking the happy
        // path compiles without the guard firing.
        let result = compile_ok(": greet .\" hi\" ;");
        assert!(result.instructions.iter().any(|r| r.opcode == Opcode::Out));
    }

    #[test]
    fn duplicate_vector_port_is_fatal() {
        assert_eq!(
            compile_err("vector 1 : isr_a\nvector 1 : isr_b\n: isr_a ;\n: isr_b ;"),
            ErrorKind::DuplicateVectorPort
        );
    }

    #[test]
    fn vector_resolves_to_handler_address() {
        use crate::isa::instruction_len;

        let result = compile_ok("vector 1 : isr\n: isr _iret_ ;");

        // word 0 is the entry jump; the vector table's own jump sits right
        // after it (VECTOR_BASE padding is a no-op here since the entry
        // jump already occupies two words).
        let vector_jmp = &result.instructions[1];
        assert_eq!(vector_jmp.opcode, Opcode::Jmp);

        let handler_addr: u32 =
            result.instructions[..2].iter().map(instruction_len).sum();
        assert_eq!(vector_jmp.imm, Some(handler_addr as i64));
        assert_eq!(result.instructions[2].opcode, Opcode::Iret);
    }
}
