//! Flow builders for common graph shapes.

use weft_core::{Flow, Step};

/// `step-1 -> step-2 -> ... -> step-n`, every step on `slug`
pub fn linear_flow(id: &str, steps: usize, slug: &str) -> Flow {
    let mut flow = Flow::new(id, format!("linear-{}", steps), "step-1");
    for i in 1..=steps {
        let mut step = Step::new(format!("step-{}", i), slug);
        if i < steps {
            step = step.with_next([format!("step-{}", i + 1)]);
        }
        flow = flow.with_step(step);
    }
    flow
}

/// `a -> {b, c}`, `b -> d`, `c -> d`
pub fn diamond_flow(id: &str, slug: &str) -> Flow {
    Flow::new(id, "diamond", "a")
        .with_step(Step::new("a", slug).with_next(["b", "c"]))
        .with_step(Step::new("b", slug).with_next(["d"]))
        .with_step(Step::new("c", slug).with_next(["d"]))
        .with_step(Step::new("d", slug))
}
