//! Block templates.
//!
//! Placeholder syntax inside template lines:
//! - `{NAME}` is replaced by the field `NAME`, or by the code of the value
//!   block plugged into input `NAME`, or by the template default.
//! - a line holding only `{>NAME}` (plus indentation) splices the nested
//!   statement chain of input `NAME`, indented to match.

use super::Order;
use std::collections::{BTreeMap, HashMap};

/// Python precedence of atoms (literals, names, tuples)
pub const ORDER_ATOMIC: Order = 0;
/// Python precedence of `+` and `-`
pub const ORDER_ADDITIVE: Order = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    Statement,
    Expression(Order),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub kind: String,
    pub shape: BlockShape,
    pub lines: Vec<String>,
    /// Module-level lines hoisted to the top of the generated program
    pub imports: Vec<String>,
    pub defaults: BTreeMap<String, String>,
}

impl BlockTemplate {
    pub fn statement<I, S>(kind: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            shape: BlockShape::Statement,
            lines: lines.into_iter().map(Into::into).collect(),
            imports: Vec::new(),
            defaults: BTreeMap::new(),
        }
    }

    pub fn expression(kind: impl Into<String>, text: impl Into<String>, order: Order) -> Self {
        Self {
            kind: kind.into(),
            shape: BlockShape::Expression(order),
            lines: vec![text.into()],
            imports: Vec::new(),
            defaults: BTreeMap::new(),
        }
    }

    pub fn with_import(mut self, line: impl Into<String>) -> Self {
        self.imports.push(line.into());
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }
}

/// Lookup table from block kind to template
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: HashMap<String, BlockTemplate>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one of the same kind
    pub fn register(&mut self, template: BlockTemplate) {
        self.templates.insert(template.kind.clone(), template);
    }

    pub fn get(&self, kind: &str) -> Option<&BlockTemplate> {
        self.templates.get(kind)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Generic blocks plus the face detection lesson steps
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for template in generic_templates().into_iter().chain(face_templates()) {
            catalog.register(template);
        }
        catalog
    }
}

fn generic_templates() -> Vec<BlockTemplate> {
    vec![
        BlockTemplate::statement("variables_set", ["{VAR} = {VALUE}"])
            .with_default("VAR", "item")
            .with_default("VALUE", "None"),
        BlockTemplate::statement("text_print", ["print({TEXT})"]).with_default("TEXT", "''"),
        BlockTemplate::statement(
            "controls_repeat_ext",
            ["for count in range({TIMES}):", "    {>DO}"],
        )
        .with_default("TIMES", "10"),
        BlockTemplate::statement("controls_if", ["if {IF0}:", "    {>DO0}"])
            .with_default("IF0", "False"),
        BlockTemplate::expression("math_number", "{NUM}", ORDER_ATOMIC).with_default("NUM", "0"),
        BlockTemplate::expression("text", "'{TEXT}'", ORDER_ATOMIC).with_default("TEXT", ""),
        BlockTemplate::expression("math_arithmetic", "{A} {OP} {B}", ORDER_ADDITIVE)
            .with_default("A", "0")
            .with_default("OP", "+")
            .with_default("B", "0"),
        BlockTemplate::expression("logic_boolean", "{BOOL}", ORDER_ATOMIC)
            .with_default("BOOL", "True"),
    ]
}

fn face_templates() -> Vec<BlockTemplate> {
    vec![
        BlockTemplate::statement(
            "face_ai_init_globals",
            [
                "# shared lesson state",
                "face_model = None",
                "face_img = None",
                "face_gray = None",
                "face_faces = []",
                "face_data = {}",
                "",
            ],
        )
        .with_import("import cv2")
        .with_import("import os")
        .with_import("import numpy as np"),
        BlockTemplate::statement(
            "face_ai_step1_init",
            [
                "# load the OpenCV face detection model",
                "default_model_path = cv2.data.haarcascades + '{MODEL}'",
                "model_path = default_model_path if os.path.exists(default_model_path) else '{MODEL}'",
                "face_model = cv2.CascadeClassifier(model_path)",
                "if face_model.empty():",
                "    raise RuntimeError('cannot load face model: %s' % model_path)",
                "",
            ],
        )
        .with_default("MODEL", "haarcascade_frontalface_default.xml"),
        BlockTemplate::statement(
            "face_ai_step2_input",
            [
                "# load the image",
                "face_img = None",
                "if not os.path.exists({VALUE}):",
                "    raise RuntimeError('file not found: %s' % {VALUE})",
                "face_img = cv2.imdecode(np.fromfile({VALUE}, dtype=np.uint8), -1)",
                "if face_img is None:",
                "    raise RuntimeError('cannot read image: %s' % {VALUE})",
                "",
            ],
        )
        .with_default("VALUE", "'test.jpg'"),
        BlockTemplate::statement(
            "face_ai_step2_camera",
            [
                "# grab one frame from the camera",
                "cap = cv2.VideoCapture(int({VALUE}))",
                "if not cap.isOpened():",
                "    raise RuntimeError('cannot open camera')",
                "_ret, face_img = cap.read()",
                "cap.release()",
                "if not _ret or face_img is None:",
                "    raise RuntimeError('camera read failed')",
                "",
            ],
        )
        .with_default("VALUE", "0"),
        BlockTemplate::statement(
            "face_ai_step3_process",
            [
                "# convert to grayscale",
                "if face_img is None:",
                "    raise RuntimeError('load an image first')",
                "face_gray = cv2.cvtColor(face_img, cv2.COLOR_BGR2GRAY)",
                "",
            ],
        ),
        BlockTemplate::statement(
            "face_ai_step4_detect",
            [
                "# detect faces",
                "if face_model is None or face_model.empty():",
                "    raise RuntimeError('initialise the face model first')",
                "if face_gray is None:",
                "    raise RuntimeError('preprocess the image first')",
                "face_faces = face_model.detectMultiScale(face_gray, scaleFactor={SCALE}, minNeighbors={NEIGHBORS}, minSize=(20, 20))",
                "print('faces detected:', len(face_faces))",
                "",
            ],
        )
        .with_default("SCALE", "1.1")
        .with_default("NEIGHBORS", "5"),
        BlockTemplate::statement(
            "face_ai_step5_data",
            [
                "# structured face data",
                "detected_faces = []",
                "for (x, y, w, h) in face_faces:",
                "    detected_faces.append({'x': int(x), 'y': int(y), 'w': int(w), 'h': int(h)})",
                "face_data = {'faces': detected_faces, 'count': len(detected_faces)}",
                "print('face data:', face_data)",
                "",
            ],
        ),
        BlockTemplate::statement(
            "face_ai_step6_draw",
            [
                "# draw boxes around the faces",
                "if face_img is None:",
                "    raise RuntimeError('load an image first')",
                "draw_img = face_img.copy()",
                "draw_color = (int({COLOR}[2]), int({COLOR}[1]), int({COLOR}[0]))",
                "for (x, y, w, h) in face_faces:",
                "    cv2.rectangle(draw_img, (x, y), (x + w, y + h), draw_color, {THICKNESS})",
                "    cv2.putText(draw_img, 'Face', (x, y - 10), cv2.FONT_HERSHEY_SIMPLEX, 0.9, draw_color, 2)",
                "face_img = draw_img",
                "cv2.imwrite('face_draw.jpg', face_img)",
                "",
            ],
        )
        .with_default("COLOR", "(255, 0, 0)")
        .with_default("THICKNESS", "2"),
        BlockTemplate::statement(
            "face_ai_step7_show",
            [
                "# save the final image",
                "if face_img is None:",
                "    raise RuntimeError('no image to show')",
                "save_path = 'face_result.jpg'",
                "cv2.imwrite(save_path, face_img)",
                "print('result saved to:', os.path.abspath(save_path))",
                "",
            ],
        ),
        BlockTemplate::expression("face_ai_rgb", "({R}, {G}, {B})", ORDER_ATOMIC)
            .with_default("R", "255")
            .with_default("G", "0")
            .with_default("B", "0"),
        BlockTemplate::expression("face_ai_local_image", "'{FILEPATH}'", ORDER_ATOMIC)
            .with_default("FILEPATH", "test.jpg"),
    ]
}
