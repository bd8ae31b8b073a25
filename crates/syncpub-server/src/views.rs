//! HTML views.
//!
//! Pages are assembled as strings; every interpolated value goes through
//! `html_escape` first.

use html_escape::{encode_double_quoted_attribute, encode_text};
use syncpub_registry::Policy;
use syncpub_storage::{Document, WorkspaceId};

/// What the index page may reveal about hosted workspaces.
#[derive(Debug)]
pub(crate) enum Listing {
    /// Discoverable pub: every id, sorted.
    Ids(Vec<WorkspaceId>),
    /// Private pub: only how many there are.
    Count(usize),
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        encode_text(title)
    )
}

/// Render `GET /`.
pub(crate) fn index_page(listing: &Listing, policy: &Policy) -> String {
    let push = if policy.readonly {
        "Readonly: peers can pull but not push."
    } else {
        "Peers can push and pull."
    };
    let create = if policy.creates_on_push() {
        "New workspaces are created when a peer pushes to them."
    } else {
        "Only existing workspaces accept pushes."
    };
    let mut body = format!("<h1>syncpub</h1>\n<ul>\n<li>{push}</li>\n<li>{create}</li>\n</ul>\n");

    match listing {
        Listing::Ids(ids) if ids.is_empty() => body.push_str("<p>No workspaces yet.</p>\n"),
        Listing::Ids(ids) => {
            body.push_str("<h2>Workspaces</h2>\n<ul>\n");
            for id in ids {
                let href = format!("/workspace/{id}");
                body.push_str(&format!(
                    "<li><a href=\"{}\">{}</a></li>\n",
                    encode_double_quoted_attribute(&href),
                    encode_text(id.as_str())
                ));
            }
            body.push_str("</ul>\n");
        }
        Listing::Count(count) => body.push_str(&format!(
            "<p>This pub hosts {count} workspace(s). Workspace names are private.</p>\n"
        )),
    }

    body.push_str(
        "<form method=\"post\" action=\"/demo-hack/create-demo-workspace\">\
         <button type=\"submit\">Create demo workspace</button></form>\n",
    );
    page("syncpub", &body)
}

/// Render `GET /workspace/{id}` with the current document per path.
pub(crate) fn workspace_page(id: &WorkspaceId, docs: &[Document]) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<p><a href=\"/\">All workspaces</a></p>\n<p>{} document(s)</p>\n",
        encode_text(id.as_str()),
        docs.len()
    );

    for doc in docs {
        body.push_str(&format!(
            "<h3>{}</h3>\n<p>by {} at {}</p>\n<pre>{}</pre>\n",
            encode_text(&doc.path),
            encode_text(&doc.author),
            doc.timestamp,
            encode_text(&doc.content)
        ));
    }

    let action = format!("/api/{id}/delete");
    body.push_str(&format!(
        "<form method=\"post\" action=\"{}\"><button type=\"submit\">Remove from pub</button></form>\n",
        encode_double_quoted_attribute(&action)
    ));
    page(id.as_str(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = "@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6ea";

    #[test]
    fn test_index_lists_ids_when_discoverable() {
        let ids = vec![
            WorkspaceId::parse("+a.x").unwrap(),
            WorkspaceId::parse("+b.y").unwrap(),
        ];
        let html = index_page(&Listing::Ids(ids), &Policy::default());

        assert!(html.contains("<a href=\"/workspace/+a.x\">+a.x</a>"));
        assert!(html.contains("+b.y"));
    }

    #[test]
    fn test_index_hides_ids_when_private() {
        let html = index_page(&Listing::Count(2), &Policy::default());

        assert!(html.contains("hosts 2 workspace(s)"));
        assert!(!html.contains("/workspace/"));
    }

    #[test]
    fn test_workspace_page_escapes_content() {
        let id = WorkspaceId::parse("+test.a").unwrap();
        let doc = Document::compose(&id, AUTHOR, "/a", "<script>alert(1)</script>", 1_600_000_000_000_000);

        let html = workspace_page(&id, &[doc]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("action=\"/api/+test.a/delete\""));
    }

    #[test]
    fn test_index_describes_policy() {
        let policy = Policy {
            readonly: true,
            ..Policy::default()
        };
        let html = index_page(&Listing::Count(0), &policy);

        assert!(html.contains("<li>Readonly: peers can pull but not push.</li>\n"));
        assert!(html.contains("<li>Only existing workspaces accept pushes.</li>\n"));
    }
}
