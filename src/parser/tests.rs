#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::ast::{Binding, Program, SizeRef, Statement};
    use crate::parser::parse;

    fn parse_ok(input: &str) -> Program {
        let lexed = tokenize(input);
        assert!(lexed.errors.is_empty(), "lexer errors: {:?}", lexed.errors);
        parse(&lexed.tokens).expect("expected parse to succeed")
    }

    fn parse_err(input: &str) -> ErrorKind {
        let lexed = tokenize(input);
        assert!(lexed.errors.is_empty(), "lexer errors: {:?}", lexed.errors);
        parse(&lexed.tokens).expect_err("expected parse to fail").kind
    }

    #[test]
    fn empty_program() {
        let program = parse_ok("");
        assert!(program.bindings.is_empty());
        assert!(program.body.is_empty());
    }

    #[test]
    fn top_level_number_statement() {
        let program = parse_ok("42");
        assert_eq!(program.body, vec![Statement::Number(42)]);
    }

    #[test]
    fn top_level_ident_statement() {
        let program = parse_ok("dup swap");
        assert_eq!(
            program.body,
            vec![Statement::Ident("dup".into()), Statement::Ident("swap".into())]
        );
    }

    #[test]
    fn simple_definition() {
        let program = parse_ok(": square dup * ;");
        assert_eq!(program.bindings.len(), 1);
        match &program.bindings[0] {
            Binding::Definition { name, body } => {
                assert_eq!(name, "square");
                assert_eq!(
                    *body,
                    vec![
                        Statement::Ident("dup".into()),
                        Statement::Ident("*".into())
                    ]
                );
            }
            other => panic!("expected Definition, got {other:?}"),
        }
    }

    #[test]
    fn definition_name_cannot_be_keyword() {
        assert_eq!(parse_err(": if dup ;"), ErrorKind::KeywordAsIdentifier);
    }

    #[test]
    fn var_declaration() {
        let program = parse_ok("var counter");
        assert_eq!(program.bindings, vec![Binding::Variable { name: "counter".into() }]);
    }

    #[test]
    fn str_declaration() {
        let program = parse_ok("str greet \"hi\"");
        assert_eq!(
            program.bindings,
            vec![Binding::StringLit { name: "greet".into(), text: "hi".into() }]
        );
    }

    #[test]
    fn const_declaration() {
        let program = parse_ok("const LIMIT 10");
        assert_eq!(program.bindings, vec![Binding::Const { name: "LIMIT".into(), value: 10 }]);
    }

    #[test]
    fn alloc_with_literal_size() {
        let program = parse_ok("alloc buf 8");
        assert_eq!(
            program.bindings,
            vec![Binding::Alloc { name: "buf".into(), size: SizeRef::Literal(8) }]
        );
    }

    #[test]
    fn alloc_with_const_size() {
        let program = parse_ok("const N 4\nalloc buf N");
        assert_eq!(
            program.bindings[1],
            Binding::Alloc { name: "buf".into(), size: SizeRef::ConstRef("N".into()) }
        );
    }

    #[test]
    fn vector_requires_colon() {
        assert_eq!(
            parse_err("vector 1 isr"),
            ErrorKind::UnexpectedToken
        );
    }

    #[test]
    fn vector_declaration() {
        let program = parse_ok("vector 1 : isr");
        assert_eq!(
            program.bindings,
            vec![Binding::Vector { port: SizeRef::Literal(1), handler_name: "isr".into() }]
        );
    }

    #[test]
    fn vector_with_const_port() {
        let program = parse_ok("const KBD 1 vector KBD : isr");
        assert_eq!(
            program.bindings[1],
            Binding::Vector { port: SizeRef::ConstRef("KBD".into()), handler_name: "isr".into() }
        );
    }

    #[test]
    fn if_then() {
        let program = parse_ok("1 if 2 then");
        assert_eq!(
            program.body,
            vec![
                Statement::Number(1),
                Statement::IfStmt { then_body: vec![Statement::Number(2)], else_body: None }
            ]
        );
    }

    #[test]
    fn if_else_then() {
        let program = parse_ok("1 if 2 else 3 then");
        assert_eq!(
            program.body[1],
            Statement::IfStmt {
                then_body: vec![Statement::Number(2)],
                else_body: Some(vec![Statement::Number(3)])
            }
        );
    }

    #[test]
    fn begin_until() {
        let program = parse_ok("begin dup next_step until");
        assert_eq!(
            program.body,
            vec![Statement::BeginLoop {
                body: vec![Statement::Ident("dup".into()), Statement::Ident("next_step".into())]
            }]
        );
    }

    #[test]
    fn times_next() {
        let program = parse_ok("3 times 65 emit next");
        assert_eq!(
            program.body,
            vec![
                Statement::Number(3),
                Statement::TimesLoop {
                    body: vec![Statement::Number(65), Statement::Ident("emit".into())]
                }
            ]
        );
    }

    #[test]
    fn nested_if_inside_times() {
        let program = parse_ok("times 1 if 2 then next");
        match &program.body[0] {
            Statement::TimesLoop { body } => {
                assert_eq!(
                    *body,
                    vec![
                        Statement::Number(1),
                        Statement::IfStmt {
                            then_body: vec![Statement::Number(2)],
                            else_body: None
                        }
                    ]
                );
            }
            other => panic!("expected TimesLoop, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_definition_is_fatal() {
        assert_eq!(parse_err(": oops dup"), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn unterminated_if_is_fatal() {
        assert_eq!(parse_err("1 if 2"), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn const_of_const_is_rejected() {
        // `const` requires a literal, not another const's name.
        assert_eq!(parse_err("const A 1\nconst B A"), ErrorKind::ExpectedLiteral);
    }

    #[test]
    fn print_string_marker_is_ident_then_str() {
        let program = parse_ok(".\" hi\"");
        assert_eq!(
            program.body,
            vec![Statement::Ident(".\"".into()), Statement::Str("hi".into())]
        );
    }
}
