use crate::{Config, Css, Immediate, StyleNode, StyleSheet, Value, style};

const BASE_DIR: &str = "./src/tests";

#[track_caller]
fn run_test(test_name: &str, globals: Vec<StyleNode>, styles: &[StyleNode]) {
    use std::io::Write as _;

    let _ = env_logger::try_init();

    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile(format!("{test_name}.css")).unwrap();

    let sheet = StyleSheet::new();
    let css = Css::new(globals, Config::new().tick(Immediate).sink(sheet.clone())).unwrap();
    for node in styles {
        css.css(node, None).unwrap();
    }

    for element in sheet.elements() {
        let _ = writeln!(file, "{element}");
    }
}

fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or_default()
}

fn font_px() -> Value {
    Value::macro_fn(|v| style! { "fontSize" => format!("{v}px") })
}

fn dp() -> Value {
    Value::resolver(|token, _| {
        let n = token.strip_suffix("dp")?;
        if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(format!("{}rem", n.parse::<f64>().ok()? / 16.0))
    })
}

#[test]
fn empty_args() {
    run_test("empty_args", vec![], &[StyleNode::new()]);
}

#[test]
fn basic_props_and_children() {
    run_test(
        "basic_props_and_children",
        vec![style! { "$16dp" => "1rem" }],
        &[style! {
            "& > *" => style! {
                "fontSize" => "$16dp",
                "color" => "red",
            },
        }],
    );
}

#[test]
fn basic_macros() {
    run_test(
        "basic_macros",
        vec![style! {
            "$$font" => Value::macro_fn(|v| style! {
                "fontSize" => format!("{v}px"),
                "fontFamily" => "serif",
            }),
        }],
        &[style! { "& > *" => style! { "font" => 32 } }],
    );
}

#[test]
fn multiple_css_with_macros() {
    run_test(
        "multiple_css_with_macros",
        vec![style! { "$$font" => font_px() }],
        &[
            style! {
                "$$font2" => Value::macro_fn(|v| style! { "font" => num(v) * 2.0 }),
                "font2" => 16,
            },
            style! {
                "$$font2" => Value::macro_fn(|v| style! { "font" => num(v) * 3.0 }),
                "font2" => 16,
            },
        ],
    );
}

#[test]
fn multiple_objects_with_macros() {
    run_test(
        "multiple_objects_with_macros",
        vec![
            style! { "$$font" => font_px() },
            style! { "$$font2" => Value::macro_fn(|v| style! { "font" => num(v) * 2.0 }) },
            style! { "$$font3" => Value::macro_fn(|v| style! { "font2" => num(v) * 3.0 }) },
        ],
        &[style! { "font3" => 16 }],
    );
}

#[test]
fn duplicate_filtering() {
    run_test(
        "duplicate_filtering",
        vec![],
        &[
            style! { "fontSize" => "1rem" },
            style! { "fontSize" => "1rem" },
        ],
    );
}

#[test]
fn token_resolver() {
    run_test(
        "token_resolver",
        vec![style! {
            "$$" => dp(),
            "fontSize" => "$$16dp",
        }],
        &[
            style! { "fontSize" => "$$14dp" },
            style! { "fontSize" => "$$18dp" },
        ],
    );
}

#[test]
fn bare_token_resolver() {
    run_test(
        "bare_token_resolver",
        vec![style! {
            "$$" => dp(),
            "fontSize" => "16dp",
        }],
        &[
            style! { "fontSize" => "14dp" },
            style! { "fontSize" => "18dp" },
        ],
    );
}

#[test]
fn macro_combination() {
    run_test(
        "macro_combination",
        vec![style! {
            "$$" => dp(),
            "$$fontSize" => Value::macro_fn(|v| style! { "fontSize" => v.clone() }),
            "fontSize" => "$$16dp",
        }],
        &[
            style! { "fontSize" => "$$14dp" },
            style! { "fontSize" => "$$18dp" },
        ],
    );
}

#[test]
fn recursive_like_macros() {
    run_test(
        "recursive_like_macros",
        vec![style! {
            "$$userSelect" => Value::macro_fn(|v| style! {
                "WebkitUserDrag" => v.clone(),
                "WebkitUserSelect" => v.clone(),
                "userSelect" => v.clone(),
            }),
        }],
        &[style! { "userSelect" => "none" }],
    );
}

#[test]
fn nested_macros() {
    run_test(
        "nested_macros",
        vec![style! {
            "$$f" => Value::macro_fn(|v| style! { "$x" => format!("{v}f") }),
            "$$g" => Value::macro_fn(|v| style! { "$y" => format!("{v}g") }),
            "& > *" => style! {
                "$$f" => Value::macro_fn(|v| style! { "f" => format!("{v}F") }),
                "$$g" => Value::macro_fn(|v| style! { "g" => format!("{v}G") }),
                "f" => ">",
                "g" => ">",
            },
            "f" => "&",
            "g" => "&",
        }],
        &[style! { "f" => "^", "g" => "^" }],
    );
}

#[test]
fn complex_macros() {
    run_test(
        "complex_macros",
        vec![style! {
            "$$f" => Value::macro_fn(|a| {
                let a = num(a);
                style! {
                    "$$g" => Value::macro_fn(move |b| {
                        let b = num(b);
                        style! {
                            "$$h" => Value::macro_fn(move |c| style! {
                                "$x" => a * 100.0 + b * 10.0 + num(c),
                            }),
                        }
                    }),
                }
            }),
            "& > *" => style! {
                "& > *" => style! { "f" => 1, "g" => 2, "h" => 3 },
                "f" => 4,
                "g" => 5,
                "h" => 6,
            },
            "h" => 9,
        }],
        &[],
    );
}

#[test]
fn macro_declaration_in_macro() {
    run_test(
        "macro_declaration_in_macro",
        vec![
            style! {
                "$$f" => Value::macro_fn(|x| {
                    let x = num(x);
                    style! {
                        "$$g" => Value::macro_fn(move |y| style! { "$x" => x + num(y) }),
                    }
                }),
            },
            style! {
                "f" => 100,
                "$$h1" => Value::macro_fn(|x| style! { "g" => num(x) + 10.0 }),
            },
            style! {
                "f" => 200,
                "$$h2" => Value::macro_fn(|x| style! { "g" => num(x) + 20.0 }),
            },
            style! { "h1" => 1, "h2" => 2 },
        ],
        &[],
    );
}
