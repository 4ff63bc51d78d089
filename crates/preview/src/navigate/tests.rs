use std::sync::Arc;

use glint_dom::{Document, Element};

use super::*;
use crate::reconcile::{reconcile, skip_nothing};

#[derive(Default)]
struct Recorder(parking_lot::Mutex<Vec<String>>);

impl NavigationHandler for Recorder {
	fn navigate(&self, target: &str) {
		self.0.lock().push(target.to_owned());
	}
}

fn setup(markup: &str) -> (Document, Arc<Recorder>, NavigationInterceptor) {
	let mut doc = Document::new();
	reconcile(&mut doc, markup, &skip_nothing).unwrap();
	let recorder = Arc::new(Recorder::default());
	let interceptor = NavigationInterceptor::attach(&doc, recorder.clone());
	(doc, recorder, interceptor)
}

fn find_text(doc: &Document, text: &str) -> NodeId {
	doc.descendants(doc.root())
		.find(|&id| doc.data(id).and_then(|d| d.as_text()) == Some(text))
		.unwrap()
}

#[test]
fn nested_activation_is_forwarded() {
	let (doc, recorder, nav) = setup(r#"<p>see <a href="https://example.com"><em>here</em></a></p>"#);
	let mut act = Activation::new(find_text(&doc, "here"));
	assert_eq!(nav.dispatch(&doc, &mut act).as_deref(), Some("https://example.com"));
	assert!(act.default_prevented);
	assert_eq!(*recorder.0.lock(), vec!["https://example.com"]);
}

#[test]
fn non_anchor_activation_is_ignored() {
	let (doc, recorder, nav) = setup(r#"<p>plain</p><a href="/x">x</a>"#);
	let mut act = Activation::new(find_text(&doc, "plain"));
	assert_eq!(nav.dispatch(&doc, &mut act), None);
	assert!(!act.default_prevented);
	assert!(recorder.0.lock().is_empty());
}

#[test]
fn empty_href_prevents_but_does_not_forward() {
	let (doc, recorder, nav) = setup(r#"<a href="  ">x</a><a name="anchor">y</a>"#);
	for text in ["x", "y"] {
		let mut act = Activation::new(find_text(&doc, text));
		assert_eq!(nav.dispatch(&doc, &mut act), None);
		assert!(act.default_prevented);
	}
	assert!(recorder.0.lock().is_empty());
}

#[test]
fn unvalidated_targets_are_passed_through() {
	let (doc, recorder, nav) = setup(r#"<a href="javascript:alert(1)">x</a>"#);
	let mut act = Activation::new(find_text(&doc, "x"));
	nav.dispatch(&doc, &mut act);
	assert_eq!(*recorder.0.lock(), vec!["javascript:alert(1)"]);
}

#[test]
fn survives_reconciliation() {
	let (mut doc, recorder, nav) = setup(r#"<p><a href="/one">link</a></p>"#);
	reconcile(&mut doc, r#"<ul><li><a href="/two">link</a></li></ul>"#, &skip_nothing).unwrap();
	let mut act = Activation::new(find_text(&doc, "link"));
	nav.dispatch(&doc, &mut act);
	assert_eq!(*recorder.0.lock(), vec!["/two"]);
}

#[test]
fn detached_targets_are_outside_the_root() {
	let (mut doc, recorder, nav) = setup("");
	let mut anchor = Element::new("a");
	anchor.attrs.push(glint_dom::Attr::new("href", "/detached"));
	let detached = doc.create_element(anchor);
	let mut act = Activation::new(detached);
	assert_eq!(nav.dispatch(&doc, &mut act), None);
	assert!(recorder.0.lock().is_empty());
}

#[test]
fn closures_are_handlers() {
	let seen = Arc::new(parking_lot::Mutex::new(None));
	let sink = seen.clone();
	let mut doc = Document::new();
	reconcile(&mut doc, r#"<a href="/c">c</a>"#, &skip_nothing).unwrap();
	let nav = NavigationInterceptor::attach(&doc, Arc::new(move |t: &str| *sink.lock() = Some(t.to_owned())));
	let mut act = Activation::new(find_text(&doc, "c"));
	nav.dispatch(&doc, &mut act);
	assert_eq!(seen.lock().as_deref(), Some("/c"));
}

#[test]
fn anchors_are_listed_in_order() {
	let (doc, _, _) = setup(r#"<p><a href="/a">a</a></p><a>b</a><a href="/c">c</a>"#);
	let hrefs: Vec<String> = anchors(&doc).into_iter().map(|(_, h)| h).collect();
	assert_eq!(hrefs, vec!["/a", "", "/c"]);
}
