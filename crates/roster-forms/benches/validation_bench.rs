//! Benchmarks for rule evaluation and whole-form validation.
//!
//! Run with: cargo bench -p roster-forms --bench validation_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use roster_forms::form::FormController;
use roster_forms::validation::{FieldValue, FormRules, FormValues, RuleSet, Validator};

fn user_rules() -> FormRules {
    FormRules::new()
        .field("name", RuleSet::builder().required().max_length(120).build())
        .field("email", RuleSet::builder().required().email().build())
        .field("phone", RuleSet::builder().required().phone().build())
}

fn bench_single_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_set");
    let ctx = FormValues::new();

    let cases = [
        ("email_valid", RuleSet::builder().required().email().build(), "ana.costa@example.pt"),
        ("email_invalid", RuleSet::builder().required().email().build(), "ana.costa@example"),
        ("phone_valid", RuleSet::builder().required().phone().build(), "+351 912 345 678"),
        ("required_empty", RuleSet::builder().required().email().build(), ""),
    ];

    for (name, rules, input) in cases {
        let value = FieldValue::from(input);
        group.bench_with_input(BenchmarkId::from_parameter(name), &value, |b, v| {
            b.iter(|| black_box(rules.validate(v, &ctx)))
        });
    }

    group.finish();
}

fn bench_validate_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_form");

    group.bench_function("valid", |b| {
        let mut form = FormController::new(
            FormValues::new()
                .with("name", "Ana Costa")
                .with("email", "ana@example.pt")
                .with("phone", "+351 912 345 678"),
            user_rules(),
        );
        b.iter(|| black_box(form.validate_form()))
    });

    group.bench_function("all_failing", |b| {
        let mut form = FormController::new(
            FormValues::new()
                .with("name", "")
                .with("email", "nope")
                .with("phone", "12"),
            user_rules(),
        );
        b.iter(|| black_box(form.validate_form()))
    });

    group.finish();
}

fn bench_typing(c: &mut Criterion) {
    c.bench_function("type_and_blur_email", |b| {
        let mut form = FormController::new(FormValues::new().with("email", ""), user_rules());
        let text = "ana.costa@example.pt";
        b.iter(|| {
            for end in 1..=text.len() {
                form.set_value("email", &text[..end]);
            }
            form.handle_blur("email");
            black_box(form.error("email").is_none())
        })
    });
}

criterion_group!(benches, bench_single_rules, bench_validate_form, bench_typing);

criterion_main!(benches);
