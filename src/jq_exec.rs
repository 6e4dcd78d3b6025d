//! jq pre-filter for wire payloads, so a captured request or response
//! envelope can be narrowed to the contract body before decoding.
use anyhow::{Context, Result, anyhow};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every output becomes one payload.
pub fn select_payloads(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(describe_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(describe_undefined)?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut payloads = Vec::new();
    for (index, item) in outputs.enumerate() {
        let val = item.map_err(|e| anyhow!("jq filter `{filter_src}` failed: {e:?}"))?;
        let payload = serde_json::from_str::<Value>(&val.to_string())
            .with_context(|| format!("jq output #{index} is not JSON"))?;
        payloads.push(payload);
    }
    Ok(payloads)
}

fn describe_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines = errs
        .into_iter()
        .map(|(file, err)| format!("cannot parse jq filter `{}`: {err:?}", file.code))
        .collect::<Vec<_>>();
    anyhow!(lines.join("\n"))
}

fn describe_undefined(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("undefined `{name}` ({undef:?}) in jq filter `{}`", file.code))
        })
        .collect::<Vec<_>>();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_nested_payloads() {
        let envelope = json!({"request": {"body": [{"name": "x"}, {"name": "y"}]}});
        let out = select_payloads(".request.body[]", &envelope).unwrap();
        assert_eq!(out, vec![json!({"name": "x"}), json!({"name": "y"})]);
    }

    #[test]
    fn bad_filters_are_errors() {
        assert!(select_payloads(".[", &json!({})).is_err());
        assert!(select_payloads("no_such_fn", &json!({})).is_err());
    }
}
