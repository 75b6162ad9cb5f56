//! Bundled icon catalog.
//!
//! Lucide-style 24x24 stroke icons. Each icon renders as an `<svg>` whose
//! children are the static nodes below; size, color, stroke width and extra
//! classes come from props at render time.

/// One child node of an icon's `<svg>`.
#[derive(Debug, PartialEq, Eq)]
pub struct IconNode {
    pub tag: &'static str,
    pub attrs: &'static [(&'static str, &'static str)],
}

#[derive(Debug, PartialEq, Eq)]
pub struct IconDef {
    pub name: &'static str,
    pub nodes: &'static [IconNode],
}

impl IconDef {
    /// `lucide-file-text` style class suffix.
    pub fn kebab_name(&self) -> String {
        let mut out = String::new();
        let chars: Vec<char> = self.name.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            let boundary = i > 0
                && (c.is_ascii_uppercase()
                    || (c.is_ascii_digit() && !chars[i - 1].is_ascii_digit()));
            if boundary {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        }
        out
    }
}

macro_rules! node {
    ($tag:literal $(, $k:literal = $v:literal)* $(,)?) => {
        IconNode { tag: $tag, attrs: &[$(($k, $v)),*] }
    };
}

macro_rules! icon {
    ($name:literal: [$($node:expr),* $(,)?]) => {
        IconDef { name: $name, nodes: &[$($node),*] }
    };
}

pub static ICONS: &[IconDef] = &[
    icon!("AlertCircle": [
        node!("circle", "cx" = "12", "cy" = "12", "r" = "10"),
        node!("line", "x1" = "12", "x2" = "12", "y1" = "8", "y2" = "12"),
        node!("line", "x1" = "12", "x2" = "12.01", "y1" = "16", "y2" = "16"),
    ]),
    icon!("AlertTriangle": [
        node!("path", "d" = "m21.73 18-8-14a2 2 0 0 0-3.48 0l-8 14A2 2 0 0 0 4 21h16a2 2 0 0 0 1.73-3"),
        node!("path", "d" = "M12 9v4"),
        node!("path", "d" = "M12 17h.01"),
    ]),
    icon!("ArrowLeft": [
        node!("path", "d" = "m12 19-7-7 7-7"),
        node!("path", "d" = "M19 12H5"),
    ]),
    icon!("ArrowRight": [
        node!("path", "d" = "M5 12h14"),
        node!("path", "d" = "m12 5 7 7-7 7"),
    ]),
    icon!("Bell": [
        node!("path", "d" = "M6 8a6 6 0 0 1 12 0c0 7 3 9 3 9H3s3-2 3-9"),
        node!("path", "d" = "M10.3 21a1.94 1.94 0 0 0 3.4 0"),
    ]),
    icon!("Calendar": [
        node!("rect", "width" = "18", "height" = "18", "x" = "3", "y" = "4", "rx" = "2", "ry" = "2"),
        node!("line", "x1" = "16", "x2" = "16", "y1" = "2", "y2" = "6"),
        node!("line", "x1" = "8", "x2" = "8", "y1" = "2", "y2" = "6"),
        node!("line", "x1" = "3", "x2" = "21", "y1" = "10", "y2" = "10"),
    ]),
    icon!("Check": [
        node!("path", "d" = "M20 6 9 17l-5-5"),
    ]),
    icon!("CheckCircle": [
        node!("path", "d" = "M22 11.08V12a10 10 0 1 1-5.93-9.14"),
        node!("path", "d" = "m9 11 3 3L22 4"),
    ]),
    icon!("ChevronDown": [
        node!("path", "d" = "m6 9 6 6 6-6"),
    ]),
    icon!("ChevronLeft": [
        node!("path", "d" = "m15 18-6-6 6-6"),
    ]),
    icon!("ChevronRight": [
        node!("path", "d" = "m9 18 6-6-6-6"),
    ]),
    icon!("ChevronUp": [
        node!("path", "d" = "m18 15-6-6-6 6"),
    ]),
    icon!("Clock": [
        node!("circle", "cx" = "12", "cy" = "12", "r" = "10"),
        node!("polyline", "points" = "12 6 12 12 16 14"),
    ]),
    icon!("Code": [
        node!("polyline", "points" = "16 18 22 12 16 6"),
        node!("polyline", "points" = "8 6 2 12 8 18"),
    ]),
    icon!("Copy": [
        node!("rect", "width" = "14", "height" = "14", "x" = "8", "y" = "8", "rx" = "2", "ry" = "2"),
        node!("path", "d" = "M4 16c-1.1 0-2-.9-2-2V4c0-1.1.9-2 2-2h10c1.1 0 2 .9 2 2"),
    ]),
    icon!("Download": [
        node!("path", "d" = "M21 15v4a2 2 0 0 1-2 2H5a2 2 0 0 1-2-2v-4"),
        node!("polyline", "points" = "7 10 12 15 17 10"),
        node!("line", "x1" = "12", "x2" = "12", "y1" = "15", "y2" = "3"),
    ]),
    icon!("ExternalLink": [
        node!("path", "d" = "M15 3h6v6"),
        node!("path", "d" = "M10 14 21 3"),
        node!("path", "d" = "M18 13v6a2 2 0 0 1-2 2H5a2 2 0 0 1-2-2V8a2 2 0 0 1 2-2h6"),
    ]),
    icon!("Eye": [
        node!("path", "d" = "M2 12s3-7 10-7 10 7 10 7-3 7-10 7-10-7-10-7Z"),
        node!("circle", "cx" = "12", "cy" = "12", "r" = "3"),
    ]),
    icon!("FileText": [
        node!("path", "d" = "M15 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V7Z"),
        node!("path", "d" = "M14 2v4a2 2 0 0 0 2 2h4"),
        node!("path", "d" = "M10 9H8"),
        node!("path", "d" = "M16 13H8"),
        node!("path", "d" = "M16 17H8"),
    ]),
    icon!("Heart": [
        node!("path", "d" = "M19 14c1.49-1.46 3-3.21 3-5.5A5.5 5.5 0 0 0 16.5 3c-1.76 0-3 .5-4.5 2-1.5-1.5-2.74-2-4.5-2A5.5 5.5 0 0 0 2 8.5c0 2.3 1.5 4.05 3 5.5l7 7Z"),
    ]),
    icon!("Home": [
        node!("path", "d" = "m3 9 9-7 9 7v11a2 2 0 0 1-2 2H5a2 2 0 0 1-2-2z"),
        node!("polyline", "points" = "9 22 9 12 15 12 15 22"),
    ]),
    icon!("Image": [
        node!("rect", "width" = "18", "height" = "18", "x" = "3", "y" = "3", "rx" = "2", "ry" = "2"),
        node!("circle", "cx" = "9", "cy" = "9", "r" = "2"),
        node!("path", "d" = "m21 15-3.086-3.086a2 2 0 0 0-2.828 0L6 21"),
    ]),
    icon!("Info": [
        node!("circle", "cx" = "12", "cy" = "12", "r" = "10"),
        node!("path", "d" = "M12 16v-4"),
        node!("path", "d" = "M12 8h.01"),
    ]),
    icon!("Loader2": [
        node!("path", "d" = "M21 12a9 9 0 1 1-6.219-8.56"),
    ]),
    icon!("Lock": [
        node!("rect", "width" = "18", "height" = "11", "x" = "3", "y" = "11", "rx" = "2", "ry" = "2"),
        node!("path", "d" = "M7 11V7a5 5 0 0 1 10 0v4"),
    ]),
    icon!("Mail": [
        node!("rect", "width" = "20", "height" = "16", "x" = "2", "y" = "4", "rx" = "2"),
        node!("path", "d" = "m22 7-8.97 5.7a1.94 1.94 0 0 1-2.06 0L2 7"),
    ]),
    icon!("Menu": [
        node!("line", "x1" = "4", "x2" = "20", "y1" = "12", "y2" = "12"),
        node!("line", "x1" = "4", "x2" = "20", "y1" = "6", "y2" = "6"),
        node!("line", "x1" = "4", "x2" = "20", "y1" = "18", "y2" = "18"),
    ]),
    icon!("Minus": [
        node!("path", "d" = "M5 12h14"),
    ]),
    icon!("Moon": [
        node!("path", "d" = "M12 3a6 6 0 0 0 9 9 9 9 0 1 1-9-9Z"),
    ]),
    icon!("Plus": [
        node!("path", "d" = "M5 12h14"),
        node!("path", "d" = "M12 5v14"),
    ]),
    icon!("Search": [
        node!("circle", "cx" = "11", "cy" = "11", "r" = "8"),
        node!("path", "d" = "m21 21-4.3-4.3"),
    ]),
    icon!("Settings": [
        node!("path", "d" = "M12.22 2h-.44a2 2 0 0 0-2 2v.18a2 2 0 0 1-1 1.73l-.43.25a2 2 0 0 1-2 0l-.15-.08a2 2 0 0 0-2.73.73l-.22.38a2 2 0 0 0 .73 2.73l.15.1a2 2 0 0 1 1 1.72v.51a2 2 0 0 1-1 1.74l-.15.09a2 2 0 0 0-.73 2.73l.22.38a2 2 0 0 0 2.73.73l.15-.08a2 2 0 0 1 2 0l.43.25a2 2 0 0 1 1 1.73V20a2 2 0 0 0 2 2h.44a2 2 0 0 0 2-2v-.18a2 2 0 0 1 1-1.73l.43-.25a2 2 0 0 1 2 0l.15.08a2 2 0 0 0 2.73-.73l.22-.39a2 2 0 0 0-.73-2.73l-.15-.08a2 2 0 0 1-1-1.74v-.5a2 2 0 0 1 1-1.74l.15-.09a2 2 0 0 0 .73-2.73l-.22-.38a2 2 0 0 0-2.73-.73l-.15.08a2 2 0 0 1-2 0l-.43-.25a2 2 0 0 1-1-1.73V4a2 2 0 0 0-2-2z"),
        node!("circle", "cx" = "12", "cy" = "12", "r" = "3"),
    ]),
    icon!("ShoppingCart": [
        node!("circle", "cx" = "8", "cy" = "21", "r" = "1"),
        node!("circle", "cx" = "19", "cy" = "21", "r" = "1"),
        node!("path", "d" = "M2.05 2.05h2l2.66 12.42a2 2 0 0 0 2 1.58h9.78a2 2 0 0 0 1.95-1.57l1.65-7.43H5.12"),
    ]),
    icon!("Star": [
        node!("polygon", "points" = "12 2 15.09 8.26 22 9.27 17 14.14 18.18 21.02 12 17.77 5.82 21.02 7 14.14 2 9.27 8.91 8.26 12 2"),
    ]),
    icon!("Sun": [
        node!("circle", "cx" = "12", "cy" = "12", "r" = "4"),
        node!("path", "d" = "M12 2v2"),
        node!("path", "d" = "M12 20v2"),
        node!("path", "d" = "m4.93 4.93 1.41 1.41"),
        node!("path", "d" = "m17.66 17.66 1.41 1.41"),
        node!("path", "d" = "M2 12h2"),
        node!("path", "d" = "M20 12h2"),
        node!("path", "d" = "m6.34 17.66-1.41 1.41"),
        node!("path", "d" = "m19.07 4.93-1.41 1.41"),
    ]),
    icon!("Trash2": [
        node!("path", "d" = "M3 6h18"),
        node!("path", "d" = "M19 6v14c0 1-1 2-2 2H7c-1 0-2-1-2-2V6"),
        node!("path", "d" = "M8 6V4c0-1 1-2 2-2h4c1 0 2 1 2 2v2"),
        node!("line", "x1" = "10", "x2" = "10", "y1" = "11", "y2" = "17"),
        node!("line", "x1" = "14", "x2" = "14", "y1" = "11", "y2" = "17"),
    ]),
    icon!("Upload": [
        node!("path", "d" = "M21 15v4a2 2 0 0 1-2 2H5a2 2 0 0 1-2-2v-4"),
        node!("polyline", "points" = "17 8 12 3 7 8"),
        node!("line", "x1" = "12", "x2" = "12", "y1" = "3", "y2" = "15"),
    ]),
    icon!("User": [
        node!("path", "d" = "M19 21v-2a4 4 0 0 0-4-4H9a4 4 0 0 0-4 4v2"),
        node!("circle", "cx" = "12", "cy" = "7", "r" = "4"),
    ]),
    icon!("X": [
        node!("path", "d" = "M18 6 6 18"),
        node!("path", "d" = "m6 6 12 12"),
    ]),
];

/// Look up an icon by component name; `UploadIcon` and `LucideUpload`
/// aliases resolve to `Upload`.
pub fn find(name: &str) -> Option<&'static IconDef> {
    let base = name
        .strip_suffix("Icon")
        .or_else(|| name.strip_prefix("Lucide"))
        .unwrap_or(name);
    ICONS
        .iter()
        .find(|icon| icon.name == name)
        .or_else(|| ICONS.iter().find(|icon| icon.name == base))
}
