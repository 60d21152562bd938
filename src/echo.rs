//! Built-in `echo` module, registered by the binary so a fresh setup file has
//! something to route to.
//!
//! - `echo.request` - JSON description of the request and capture groups
//! - `echo.text` - the capture groups as plain text

use crate::registry::Module;
use crate::server::{Request, Response};
use serde_json::json;

/// Module identifier used in `module.function` references.
pub const MODULE_NAME: &str = "echo";

fn request(req: &Request, res: &mut Response, groups: &[Option<String>]) -> anyhow::Result<()> {
    let query: serde_json::Map<String, serde_json::Value> = req
        .query_params
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    let body = json!({
        "request_id": req.request_id.to_string(),
        "method": req.method.as_str(),
        "path": req.path,
        "groups": groups,
        "query": query,
        "body": req.body_str(),
    });
    res.content_type = "application/json".to_string();
    res.write(&[&serde_json::to_string(&body)?]);
    Ok(())
}

fn text(_req: &Request, res: &mut Response, groups: &[Option<String>]) -> anyhow::Result<()> {
    res.content_type = "text/plain; charset=UTF-8".to_string();
    let parts: Vec<&str> = groups.iter().map(|g| g.as_deref().unwrap_or("")).collect();
    res.write(&[&parts.join(" ")]);
    Ok(())
}

/// The `echo` module.
#[must_use]
pub fn module() -> Module {
    Module::new(MODULE_NAME)
        .action("request", request)
        .action("text", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Export;

    fn invoke(symbol: &str, req: &Request, groups: &[Option<String>]) -> Response {
        let module = module();
        let Some(Export::Action(action)) = module.get(symbol) else {
            panic!("echo.{symbol} missing");
        };
        let mut res = Response::new();
        action.invoke(req, &mut res, groups).unwrap();
        res
    }

    #[test]
    fn test_request_echoes_json() {
        let req = Request::get("/echo/7").with_query_param("q", "rust");
        let res = invoke("request", &req, &[Some("7".into()), None]);
        assert_eq!(res.content_type, "application/json");
        let value: serde_json::Value = serde_json::from_str(res.body()).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["path"], "/echo/7");
        assert_eq!(value["groups"], json!(["7", null]));
        assert_eq!(value["query"]["q"], "rust");
    }

    #[test]
    fn test_text_joins_groups() {
        let res = invoke("text", &Request::get("/"), &[Some("a".into()), None, Some("c".into())]);
        assert_eq!(res.body(), "a  c");
    }
}
