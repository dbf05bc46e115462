//! Gremlin-Groovy rendering of programs (explain output)

use super::predicate::P;
use super::step::{Argument, Program};
use crate::types::Value;

/// Render a top-level program as Gremlin-Groovy source text (`g.V()...`).
pub fn to_groovy(program: &Program) -> String {
    let mut out = String::from("g");
    write_steps(&mut out, program);
    out
}

fn write_anonymous(out: &mut String, program: &Program) {
    out.push_str("__");
    if program.is_empty() {
        out.push_str(".identity()");
    } else {
        write_steps(out, program);
    }
}

fn write_steps(out: &mut String, program: &Program) {
    for step in program.steps() {
        out.push('.');
        out.push_str(step.name());
        out.push('(');
        for (i, arg) in step.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_argument(out, arg);
        }
        out.push(')');
    }
}

fn write_argument(out: &mut String, arg: &Argument) {
    match arg {
        Argument::Literal(value) => write_literal(out, value),
        Argument::Predicate(p) => write_predicate(out, p),
        Argument::Program(p) => write_anonymous(out, p),
        Argument::Label(label) => write_string(out, label),
        Argument::Scope(s) => out.push_str(&format!("Scope.{}", s)),
        Argument::Order(o) => out.push_str(&format!("Order.{}", o)),
        Argument::Pop(p) => out.push_str(&format!("Pop.{}", p)),
        Argument::Column(c) => out.push_str(&format!("Column.{}", c)),
        Argument::Cardinality(c) => out.push_str(&format!("VertexProperty.Cardinality.{}", c)),
        Argument::Token(t) => out.push_str(&format!("T.{}", t)),
        Argument::Function(func) => out.push_str(&func.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => write_string(out, s),
        Value::List(items) => {
            out.push('[');
            write_list(out, items);
            out.push(']');
        }
        Value::Map(map) if map.is_empty() => out.push_str("[:]"),
        Value::Map(map) => {
            out.push('[');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match k {
                    Value::String(s) => {
                        out.push('(');
                        write_string(out, s);
                        out.push(')');
                    }
                    other => write_literal(out, other),
                }
                out.push_str(": ");
                write_literal(out, v);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

fn write_list(out: &mut String, items: &[Value]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_literal(out, item);
    }
}

fn write_predicate(out: &mut String, p: &P) {
    match p {
        P::Eq(v) | P::Neq(v) | P::Lt(v) | P::Lte(v) | P::Gt(v) | P::Gte(v) => {
            out.push_str(&format!("P.{}(", p.name()));
            write_literal(out, v);
            out.push(')');
        }
        P::Within(vs) | P::Without(vs) => {
            out.push_str(&format!("P.{}(", p.name()));
            write_list(out, vs);
            out.push(')');
        }
        P::Between(lo, hi) => {
            out.push_str("P.between(");
            write_literal(out, lo);
            out.push_str(", ");
            write_literal(out, hi);
            out.push(')');
        }
        P::StartingWith(s) | P::EndingWith(s) | P::Containing(s) => {
            out.push_str(&format!("TextP.{}(", p.name()));
            write_string(out, s);
            out.push(')');
        }
        P::And(a, b) | P::Or(a, b) => {
            write_predicate(out, a);
            out.push_str(&format!(".{}(", p.name()));
            write_predicate(out, b);
            out.push(')');
        }
        P::Not(inner) => {
            out.push_str("P.not(");
            write_predicate(out, inner);
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::bytecode::BytecodeSteps;
    use crate::translation::function::CustomFunction;
    use crate::translation::steps::GremlinSteps;
    use crate::translation::token::{Cardinality, Column, Order};

    #[test]
    fn test_render_projection() {
        let mut g = BytecodeSteps::new();
        let mut by = g.start();
        by.select(&["n"]).unwrap().values(&["name"]);
        g.v().as_("n").project(&["n.name"]).unwrap().by(&by);
        assert_eq!(
            to_groovy(&g.current()),
            "g.V().as('n').project('n.name').by(__.select('n').values('name'))"
        );
    }

    #[test]
    fn test_render_tokens_and_predicates() {
        let mut g = BytecodeSteps::new();
        let empty = g.start();
        g.v()
            .has_p("age", P::gt(30).and(P::lt(40)))
            .has_p("name", P::starting_with("A"))
            .is(P::within(vec![Value::Int(1), Value::Int(2)]))
            .property_cardinality(Cardinality::Single, "note", "it's")
            .select_column(Column::Keys)
            .by_order(&empty, Order::Desc)
            .map_fn(CustomFunction::ToString);
        assert_eq!(
            to_groovy(&g.current()),
            "g.V().has('age', P.gt(30).and(P.lt(40))).has('name', TextP.startingWith('A'))\
             .is(P.within(1, 2)).property(VertexProperty.Cardinality.single, 'note', 'it\\'s')\
             .select(Column.keys).by(__.identity(), Order.desc).map(cypherToString())"
        );
    }

    #[test]
    fn test_render_literals() {
        let mut g = BytecodeSteps::new();
        g.inject(&[
            Value::Null,
            Value::Bool(true),
            Value::Float(1.5),
            Value::map_from(vec![("k", Value::Int(1))]),
            Value::Map(Default::default()),
        ]);
        assert_eq!(
            to_groovy(&g.current()),
            "g.inject(null, true, 1.5, [('k'): 1], [:])"
        );
    }
}
