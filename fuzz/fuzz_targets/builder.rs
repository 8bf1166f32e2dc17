#![no_main]

use std::sync::Arc;

use aotgraph::prelude::*;
use libfuzzer_sys::fuzz_target;

// Interprets the input as a stream of builder operations over a small value stack.
// Any error is acceptable; panics are not.
fn drive(data: &[u8]) -> Result<()> {
    let ctx = Arc::new(CompilationContext::new(
        Arc::new(ClassRegistry::new()),
        CompilerConfig::default(),
    ));
    let element = Arc::new(ExecutableElement::method(
        "fuzz/Unit",
        "run",
        MethodDescriptor::void(),
        ValueType::Void,
        Modifiers::STATIC,
    ));
    let mut b = BuilderPipeline::standard().build(&ctx, element);
    let labels: Vec<BlockLabel> = (0..4).map(|_| BlockLabel::new()).collect();
    let mut values: Vec<NodeId> = Vec::new();

    let pick = |values: &[NodeId], byte: u8| values.get(byte as usize % values.len().max(1)).copied();

    b.begin(&labels[0])?;
    for chunk in data.chunks(3) {
        let [op, x, y] = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let result = match op % 12 {
            0 => b.int_literal(ValueType::I32, i64::from(x) - i64::from(y)).map(Some),
            1 => b.parameter(u32::from(x % 4), ValueType::I32).map(Some),
            2..=6 => match (pick(&values, x), pick(&values, y)) {
                (Some(lhs), Some(rhs)) => {
                    let binary = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Xor, BinaryOp::Shl];
                    b.binary(binary[usize::from(op % 12 - 2)], lhs, rhs).map(Some)
                }
                _ => continue,
            },
            7 => match (pick(&values, x), pick(&values, y)) {
                (Some(lhs), Some(rhs)) => b.is_lt(lhs, rhs).map(Some),
                _ => continue,
            },
            8 => b.fence(AccessMode::SeqCst).map(|_| None),
            9 => match pick(&values, x) {
                Some(condition) => b
                    .if_(condition, &labels[usize::from(x % 4)], &labels[usize::from(y % 4)])
                    .map(|_| None),
                None => continue,
            },
            10 => b.goto(&labels[usize::from(x % 4)]).map(|_| None),
            _ => b.begin(&labels[usize::from(x % 4)]).map(|_| None),
        };
        match result {
            Ok(Some(value)) => values.push(value),
            Ok(None) | Err(_) => {}
        }
    }
    b.return_(None)?;
    b.finish()?;
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let _ = drive(data);
});
