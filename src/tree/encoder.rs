use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::encode::{
    Encodable, Encoder, KeyedEncodingContainer, KeyedEncodingContainerProtocol,
    SingleValueEncodingContainer, SingleValueEncodingContainerProtocol, UnkeyedEncodingContainer,
    UnkeyedEncodingContainerProtocol,
};
use crate::error::{Context, EncodingError};
use crate::key::{AnyCodingKey, CodingKey, CodingPath};
use crate::options::EncoderOptions;
use crate::tree::boxing::{box_f32, box_f64};
use crate::tree::node::{PartialNode, SharedArray, SharedObject};
use crate::user_info::UserInfo;
use crate::value::Value;

type Result<T> = std::result::Result<T, EncodingError>;

const KEYED_TWICE: &str =
    "Attempt to push new keyed encoding container when already previously encoded at this path.";
const UNKEYED_TWICE: &str =
    "Attempt to push new unkeyed encoding container when already previously encoded at this path.";
const SINGLE_TWICE: &str =
    "Attempt to encode value through single value container when previously value already encoded.";

struct EncoderState {
    /// Nodes opened by the values currently being boxed, innermost last.
    storage: Vec<PartialNode>,
    /// Storage height at which the value being boxed may open its container.
    depth: usize,
    coding_path: CodingPath,
}

impl EncoderState {
    fn can_encode_new_value(&self) -> bool {
        self.storage.len() == self.depth
    }
}

/// Restores path and depth when a boxed value finishes, however it exits.
struct Frame<'a> {
    state: &'a RefCell<EncoderState>,
    saved_path: CodingPath,
    saved_depth: usize,
    start: usize,
}

impl<'a> Frame<'a> {
    fn enter(state: &'a RefCell<EncoderState>, path: CodingPath) -> Self {
        let mut guard = state.borrow_mut();
        let start = guard.storage.len();
        let saved_path = std::mem::replace(&mut guard.coding_path, path);
        let saved_depth = std::mem::replace(&mut guard.depth, start);
        Frame {
            state,
            saved_path,
            saved_depth,
            start,
        }
    }

    /// The node the value opened, if it opened one.
    fn take_node(&self) -> Option<PartialNode> {
        let mut state = self.state.borrow_mut();
        if state.storage.len() <= self.start {
            return None;
        }
        let node = state.storage.pop();
        state.storage.truncate(self.start);
        node
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.storage.truncate(self.start);
            state.coding_path = std::mem::take(&mut self.saved_path);
            state.depth = self.saved_depth;
        }
    }
}

/// Where a super encoder's top-level value lands inside its parent.
#[derive(Clone)]
enum SuperSlot {
    Key { object: SharedObject, key: String },
    Index { array: SharedArray, index: usize },
}

impl SuperSlot {
    fn with_node<R>(&self, f: impl FnOnce(&mut PartialNode) -> R) -> R {
        match self {
            SuperSlot::Key { object, key } => {
                let mut entries = object.borrow_mut();
                let node = entries
                    .entry(key.clone())
                    .or_insert_with(PartialNode::empty_object);
                f(node)
            }
            SuperSlot::Index { array, index } => f(&mut array.borrow_mut()[*index]),
        }
    }

    fn claim_object(&self) -> SharedObject {
        self.with_node(|node| match node {
            PartialNode::Object(object) => object.clone(),
            _ => panic!("{KEYED_TWICE}"),
        })
    }

    fn claim_array(&self) -> SharedArray {
        self.with_node(|node| match node {
            PartialNode::Array(array) => array.clone(),
            placeholder if placeholder.is_empty_object() => {
                let array = PartialNode::new_array();
                *placeholder = PartialNode::Array(array.clone());
                array
            }
            _ => panic!("{UNKEYED_TWICE}"),
        })
    }

    fn claim_value(&self, value: PartialNode) {
        self.with_node(|node| {
            assert!(node.is_empty_object(), "{SINGLE_TWICE}");
            *node = value;
        })
    }
}

/// Encoder producing a [`Value`] tree.
///
/// Handles are cheap to clone and share one storage stack per pass. A super
/// encoder gets its own stack plus a slot in the parent node that its
/// top-level container is written through.
#[derive(Clone)]
pub(crate) struct TreeEncoder {
    state: Rc<RefCell<EncoderState>>,
    options: Rc<EncoderOptions>,
    target: Option<SuperSlot>,
}

impl TreeEncoder {
    pub(crate) fn new(options: Rc<EncoderOptions>) -> Self {
        TreeEncoder::at(CodingPath::root(), options, None)
    }

    fn at(coding_path: CodingPath, options: Rc<EncoderOptions>, target: Option<SuperSlot>) -> Self {
        TreeEncoder {
            state: Rc::new(RefCell::new(EncoderState {
                storage: Vec::new(),
                depth: 0,
                coding_path,
            })),
            options,
            target,
        }
    }

    fn referencing(slot: SuperSlot, coding_path: CodingPath, options: Rc<EncoderOptions>) -> Self {
        trace!("super encoder created at {coding_path}");
        TreeEncoder::at(coding_path, options, Some(slot))
    }

    /// A handle on the same stack that never writes through a super slot.
    fn detached(&self) -> Self {
        TreeEncoder {
            state: self.state.clone(),
            options: self.options.clone(),
            target: None,
        }
    }

    /// Runs `value`'s `encode` one level down at `path` and returns the node
    /// it produced, if any. Storage, path and depth are restored on every exit.
    pub(crate) fn box_value_if_any(
        &self,
        value: &dyn Encodable,
        path: CodingPath,
    ) -> Result<Option<PartialNode>> {
        let frame = Frame::enter(&self.state, path);
        let mut encoder = self.detached();
        let result = value.encode(&mut encoder);
        let node = frame.take_node();
        drop(frame);
        result.map(|()| node)
    }

    /// Like [`TreeEncoder::box_value_if_any`], with an empty object standing
    /// in for a value that wrote nothing.
    fn box_value(&self, value: &dyn Encodable, path: CodingPath) -> Result<PartialNode> {
        Ok(self
            .box_value_if_any(value, path)?
            .unwrap_or_else(PartialNode::empty_object))
    }

    fn push_object(&self) -> SharedObject {
        let mut state = self.state.borrow_mut();
        if state.can_encode_new_value() {
            let object = match &self.target {
                Some(slot) if state.storage.is_empty() => slot.claim_object(),
                _ => PartialNode::new_object(),
            };
            state.storage.push(PartialNode::Object(object.clone()));
            return object;
        }
        match state.storage.last() {
            Some(PartialNode::Object(object)) => object.clone(),
            _ => panic!("{KEYED_TWICE}"),
        }
    }

    fn push_array(&self) -> SharedArray {
        let mut state = self.state.borrow_mut();
        if state.can_encode_new_value() {
            let array = match &self.target {
                Some(slot) if state.storage.is_empty() => slot.claim_array(),
                _ => PartialNode::new_array(),
            };
            state.storage.push(PartialNode::Array(array.clone()));
            return array;
        }
        match state.storage.last() {
            Some(PartialNode::Array(array)) => array.clone(),
            _ => panic!("{UNKEYED_TWICE}"),
        }
    }

    fn push_single(&self, node: PartialNode) {
        let mut state = self.state.borrow_mut();
        assert!(state.can_encode_new_value(), "{SINGLE_TWICE}");
        let at_top = state.storage.is_empty();
        if let (Some(slot), true) = (&self.target, at_top) {
            slot.claim_value(node.clone());
        }
        state.storage.push(node);
    }

    fn assert_can_encode_new_value(&self) {
        assert!(self.state.borrow().can_encode_new_value(), "{SINGLE_TWICE}");
    }
}

impl Encoder for TreeEncoder {
    fn coding_path(&self) -> CodingPath {
        self.state.borrow().coding_path.clone()
    }

    fn user_info(&self) -> &UserInfo {
        &self.options.user_info
    }

    fn keyed_container(&mut self) -> KeyedEncodingContainer<AnyCodingKey> {
        let coding_path = self.coding_path();
        trace!("keyed encoding container requested at {coding_path}");
        let object = self.push_object();
        KeyedEncodingContainer::new(TreeKeyedEncodingContainer {
            encoder: self.detached(),
            object,
            coding_path,
        })
    }

    fn unkeyed_container(&mut self) -> UnkeyedEncodingContainer {
        let coding_path = self.coding_path();
        trace!("unkeyed encoding container requested at {coding_path}");
        let array = self.push_array();
        UnkeyedEncodingContainer::new(TreeUnkeyedEncodingContainer {
            encoder: self.detached(),
            array,
            coding_path,
        })
    }

    fn single_value_container(&mut self) -> SingleValueEncodingContainer {
        trace!("single value encoding container requested at {}", self.coding_path());
        SingleValueEncodingContainer::new(TreeSingleValueEncodingContainer {
            encoder: self.clone(),
        })
    }
}

struct TreeKeyedEncodingContainer {
    encoder: TreeEncoder,
    object: SharedObject,
    coding_path: CodingPath,
}

impl TreeKeyedEncodingContainer {
    fn converted(&self, key: &AnyCodingKey) -> String {
        self.encoder
            .options
            .key_encoding_strategy
            .convert(&self.coding_path, key)
    }

    fn insert(&mut self, key: &AnyCodingKey, value: impl Into<PartialNode>) -> Result<()> {
        let key = self.converted(key);
        self.object.borrow_mut().insert(key, value.into());
        Ok(())
    }

    fn referencing(&mut self, key: String, path_key: &AnyCodingKey) -> Box<dyn Encoder> {
        self.object
            .borrow_mut()
            .entry(key.clone())
            .or_insert_with(PartialNode::empty_object);
        Box::new(TreeEncoder::referencing(
            SuperSlot::Key {
                object: self.object.clone(),
                key,
            },
            self.coding_path.appending(path_key),
            self.encoder.options.clone(),
        ))
    }
}

macro_rules! keyed_insert_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        fn $method(&mut self, value: $ty, key: &AnyCodingKey) -> Result<()> {
            self.insert(key, Value::from(value))
        }
    )*};
}

impl KeyedEncodingContainerProtocol<AnyCodingKey> for TreeKeyedEncodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.coding_path.clone()
    }

    fn encode_nil(&mut self, key: &AnyCodingKey) -> Result<()> {
        self.insert(key, Value::Null)
    }

    keyed_insert_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_str(&str),
    );

    fn encode_f32(&mut self, value: f32, key: &AnyCodingKey) -> Result<()> {
        let path = self.coding_path.appending(key);
        let boxed = box_f32(
            value,
            &path,
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.insert(key, boxed)
    }

    fn encode_f64(&mut self, value: f64, key: &AnyCodingKey) -> Result<()> {
        let path = self.coding_path.appending(key);
        let boxed = box_f64(
            value,
            &path,
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.insert(key, boxed)
    }

    fn encode_value(&mut self, value: &dyn Encodable, key: &AnyCodingKey) -> Result<()> {
        let node = self
            .encoder
            .box_value(value, self.coding_path.appending(key))?;
        self.insert(key, node)
    }

    fn nested_container(&mut self, key: &AnyCodingKey) -> KeyedEncodingContainer<AnyCodingKey> {
        let converted = self.converted(key);
        let object = {
            let mut entries = self.object.borrow_mut();
            match entries.get(&converted) {
                Some(PartialNode::Object(existing)) => existing.clone(),
                _ => {
                    let object = PartialNode::new_object();
                    entries.insert(converted, PartialNode::Object(object.clone()));
                    object
                }
            }
        };
        KeyedEncodingContainer::new(TreeKeyedEncodingContainer {
            encoder: self.encoder.clone(),
            object,
            coding_path: self.coding_path.appending(key),
        })
    }

    fn nested_unkeyed_container(&mut self, key: &AnyCodingKey) -> UnkeyedEncodingContainer {
        let converted = self.converted(key);
        let array = {
            let mut entries = self.object.borrow_mut();
            match entries.get(&converted) {
                Some(PartialNode::Array(existing)) => existing.clone(),
                _ => {
                    let array = PartialNode::new_array();
                    entries.insert(converted, PartialNode::Array(array.clone()));
                    array
                }
            }
        };
        UnkeyedEncodingContainer::new(TreeUnkeyedEncodingContainer {
            encoder: self.encoder.clone(),
            array,
            coding_path: self.coding_path.appending(key),
        })
    }

    fn super_encoder(&mut self) -> Box<dyn Encoder> {
        // the reserved key is written verbatim, outside the key strategy
        let super_key = self.encoder.options.super_key.clone();
        self.referencing(super_key.string_value().to_owned(), &super_key)
    }

    fn super_encoder_for_key(&mut self, key: &AnyCodingKey) -> Box<dyn Encoder> {
        let converted = self.converted(key);
        self.referencing(converted, key)
    }
}

struct TreeUnkeyedEncodingContainer {
    encoder: TreeEncoder,
    array: SharedArray,
    coding_path: CodingPath,
}

impl TreeUnkeyedEncodingContainer {
    fn next_path(&self) -> CodingPath {
        self.coding_path
            .appending(&AnyCodingKey::index(self.array.borrow().len()))
    }

    fn push(&mut self, value: impl Into<PartialNode>) -> Result<()> {
        self.array.borrow_mut().push(value.into());
        Ok(())
    }
}

macro_rules! unkeyed_push_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        fn $method(&mut self, value: $ty) -> Result<()> {
            self.push(Value::from(value))
        }
    )*};
}

impl UnkeyedEncodingContainerProtocol for TreeUnkeyedEncodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.coding_path.clone()
    }

    fn count(&self) -> usize {
        self.array.borrow().len()
    }

    fn encode_nil(&mut self) -> Result<()> {
        self.push(Value::Null)
    }

    unkeyed_push_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_str(&str),
    );

    fn encode_f32(&mut self, value: f32) -> Result<()> {
        let boxed = box_f32(
            value,
            &self.next_path(),
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.push(boxed)
    }

    fn encode_f64(&mut self, value: f64) -> Result<()> {
        let boxed = box_f64(
            value,
            &self.next_path(),
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.push(boxed)
    }

    fn encode_value(&mut self, value: &dyn Encodable) -> Result<()> {
        let node = self.encoder.box_value(value, self.next_path())?;
        self.push(node)
    }

    fn nested_container(&mut self) -> KeyedEncodingContainer<AnyCodingKey> {
        let coding_path = self.next_path();
        let object = PartialNode::new_object();
        self.array
            .borrow_mut()
            .push(PartialNode::Object(object.clone()));
        KeyedEncodingContainer::new(TreeKeyedEncodingContainer {
            encoder: self.encoder.clone(),
            object,
            coding_path,
        })
    }

    fn nested_unkeyed_container(&mut self) -> UnkeyedEncodingContainer {
        let coding_path = self.next_path();
        let array = PartialNode::new_array();
        self.array.borrow_mut().push(PartialNode::Array(array.clone()));
        UnkeyedEncodingContainer::new(TreeUnkeyedEncodingContainer {
            encoder: self.encoder.clone(),
            array,
            coding_path,
        })
    }

    fn super_encoder(&mut self) -> Box<dyn Encoder> {
        let coding_path = self.next_path();
        let index = {
            let mut items = self.array.borrow_mut();
            items.push(PartialNode::empty_object());
            items.len() - 1
        };
        Box::new(TreeEncoder::referencing(
            SuperSlot::Index {
                array: self.array.clone(),
                index,
            },
            coding_path,
            self.encoder.options.clone(),
        ))
    }
}

struct TreeSingleValueEncodingContainer {
    encoder: TreeEncoder,
}

impl TreeSingleValueEncodingContainer {
    fn write(&mut self, value: impl Into<PartialNode>) -> Result<()> {
        self.encoder.push_single(value.into());
        Ok(())
    }
}

macro_rules! single_write_encoders {
    ($($method:ident($ty:ty)),* $(,)?) => {$(
        fn $method(&mut self, value: $ty) -> Result<()> {
            self.write(Value::from(value))
        }
    )*};
}

impl SingleValueEncodingContainerProtocol for TreeSingleValueEncodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.encoder.coding_path()
    }

    fn encode_nil(&mut self) -> Result<()> {
        self.write(Value::Null)
    }

    single_write_encoders!(
        encode_bool(bool),
        encode_i8(i8),
        encode_i16(i16),
        encode_i32(i32),
        encode_i64(i64),
        encode_u8(u8),
        encode_u16(u16),
        encode_u32(u32),
        encode_u64(u64),
        encode_str(&str),
    );

    fn encode_f32(&mut self, value: f32) -> Result<()> {
        self.encoder.assert_can_encode_new_value();
        let boxed = box_f32(
            value,
            &self.encoder.coding_path(),
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.write(boxed)
    }

    fn encode_f64(&mut self, value: f64) -> Result<()> {
        self.encoder.assert_can_encode_new_value();
        let boxed = box_f64(
            value,
            &self.encoder.coding_path(),
            &self.encoder.options.non_conforming_float_encoding_strategy,
        )?;
        self.write(boxed)
    }

    fn encode_value(&mut self, value: &dyn Encodable) -> Result<()> {
        self.encoder.assert_can_encode_new_value();
        let node = self.encoder.box_value(value, self.encoder.coding_path())?;
        self.write(node)
    }
}

/// Encodes `value` as a top-level tree.
pub(crate) fn encode_top_level<T: Encodable>(
    value: &T,
    options: Rc<EncoderOptions>,
) -> Result<Value> {
    let encoder = TreeEncoder::new(options);
    match encoder.box_value_if_any(value, CodingPath::root())? {
        Some(node) => Ok(node.finish()),
        None => {
            let name = std::any::type_name::<T>();
            Err(EncodingError::invalid_value(
                name,
                Context::new(
                    CodingPath::root(),
                    format!("Top-level {name} did not encode any values."),
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EncoderExt;

    struct Pair(i32, &'static str);

    impl Encodable for Pair {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
            let mut container = encoder.unkeyed_container();
            container.encode_i32(self.0)?;
            container.encode_str(self.1)
        }
    }

    struct Silent;

    impl Encodable for Silent {
        fn encode(&self, _encoder: &mut dyn Encoder) -> Result<()> {
            Ok(())
        }
    }

    struct Twice;

    impl Encodable for Twice {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
            let mut container = encoder.single_value_container();
            container.encode_bool(true)?;
            container.encode_bool(false)
        }
    }

    struct Mixed;

    impl Encodable for Mixed {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
            let _keyed = encoder.container::<AnyCodingKey>();
            let _unkeyed = encoder.unkeyed_container();
            Ok(())
        }
    }

    struct PathProbe;

    impl Encodable for PathProbe {
        fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
            let path = encoder.coding_path();
            let mut container = encoder.single_value_container();
            container.encode_str(&path.to_string())
        }
    }

    fn encode(value: &impl Encodable) -> Result<Value> {
        encode_top_level(value, Rc::new(EncoderOptions::default()))
    }

    #[test]
    fn test_unkeyed_top_level() {
        let value = encode(&Pair(7, "seven")).unwrap();
        assert_eq!(value.to_string(), r#"[7,"seven"]"#);
    }

    #[test]
    fn test_top_level_without_values_fails() {
        let error = encode(&Silent).unwrap_err();
        let EncodingError::InvalidValue { context, .. } = error;
        assert!(context.debug_description.starts_with("Top-level "));
        assert!(context.debug_description.ends_with("Silent did not encode any values."));
    }

    #[test]
    fn test_nested_silent_value_becomes_empty_object() {
        struct Holder;
        impl Encodable for Holder {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
                let mut container = encoder.unkeyed_container();
                container.encode(&Silent)
            }
        }
        assert_eq!(encode(&Holder).unwrap().to_string(), "[{}]");
    }

    #[test]
    fn test_paths_seen_by_nested_values() {
        struct Outer;
        impl Encodable for Outer {
            fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
                let mut container = encoder.container::<AnyCodingKey>();
                container.encode(&PathProbe, AnyCodingKey::new("a"))?;
                let mut list = container.nested_unkeyed_container(AnyCodingKey::new("b"));
                list.encode(&PathProbe)?;
                list.encode(&PathProbe)
            }
        }
        let value = encode(&Outer).unwrap();
        assert_eq!(value.to_string(), r#"{"a":"a","b":["b[0]","b[1]"]}"#);
    }

    #[test]
    #[should_panic(expected = "single value container")]
    fn test_double_single_value_write_panics() {
        let _ = encode(&Twice);
    }

    #[test]
    #[should_panic(expected = "unkeyed encoding container")]
    fn test_mixed_top_level_containers_panic() {
        let _ = encode(&Mixed);
    }
}
