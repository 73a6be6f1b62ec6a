//! One constructor per tag.
//!
//! `tags::div(props, children)` is `create_element("div", props, children)`.
//! SVG tags live in [`svg`] so that `text`, `use` and friends do not clash
//! with their HTML neighbours.

use super::binder::IntoView;
use super::element::{create_element, Props};
use super::node::Node;
use crate::error::DomError;

macro_rules! tags {
    ($($name:ident => $tag:literal),* $(,)?) => {
        $(
            #[doc = concat!("Create a `<", $tag, ">` element.")]
            pub fn $name(props: Props, children: impl IntoView) -> Result<Node, DomError> {
                create_element($tag, props, children)
            }
        )*
    };
}

tags! {
    a => "a",
    abbr => "abbr",
    article => "article",
    aside => "aside",
    b => "b",
    blockquote => "blockquote",
    br => "br",
    button => "button",
    canvas => "canvas",
    code => "code",
    details => "details",
    dialog => "dialog",
    div => "div",
    dl => "dl",
    dd => "dd",
    dt => "dt",
    em => "em",
    fieldset => "fieldset",
    figure => "figure",
    footer => "footer",
    form => "form",
    h1 => "h1",
    h2 => "h2",
    h3 => "h3",
    h4 => "h4",
    h5 => "h5",
    h6 => "h6",
    header => "header",
    hr => "hr",
    i => "i",
    img => "img",
    input => "input",
    label => "label",
    legend => "legend",
    li => "li",
    main => "main",
    nav => "nav",
    ol => "ol",
    option => "option",
    p => "p",
    pre => "pre",
    section => "section",
    select => "select",
    small => "small",
    span => "span",
    strong => "strong",
    summary => "summary",
    table => "table",
    tbody => "tbody",
    td => "td",
    textarea => "textarea",
    th => "th",
    thead => "thead",
    tr => "tr",
    ul => "ul",
}

/// SVG element constructors.
pub mod svg {
    use super::*;

    tags! {
        svg => "svg",
        path => "path",
        circle => "circle",
        rect => "rect",
        line => "line",
        g => "g",
        text => "text",
        polygon => "polygon",
        polyline => "polyline",
        ellipse => "ellipse",
        r#use => "use",
        defs => "defs",
        marker => "marker",
        clip_path => "clipPath",
        mask => "mask",
    }
}
