use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;

use crate::decode::{
    DecodePlace, Decoder, KeyedDecodingContainer, KeyedDecodingContainerProtocol,
    SingleValueDecodingContainer, SingleValueDecodingContainerProtocol, UnkeyedDecodingContainer,
    UnkeyedDecodingContainerProtocol,
};
use crate::error::{Context, DecodingError, missing_key_description};
use crate::key::{AnyCodingKey, CodingKey, CodingPath};
use crate::options::DecoderOptions;
use crate::tree::boxing::{
    mismatch_named, unbox_bool, unbox_f32, unbox_f64, unbox_integer, unbox_string,
};
use crate::tree::node::SharedNode;
use crate::user_info::UserInfo;

type Result<T> = std::result::Result<T, DecodingError>;

struct DecoderState {
    /// Nodes of the values currently being decoded, innermost last.
    storage: Vec<SharedNode>,
    coding_path: CodingPath,
}

/// Pushes a node and its path for one nested decode; pops both on drop.
struct Frame<'a> {
    state: &'a RefCell<DecoderState>,
    saved_path: CodingPath,
    start: usize,
}

impl<'a> Frame<'a> {
    fn enter(state: &'a RefCell<DecoderState>, path: CodingPath, node: SharedNode) -> Self {
        let mut guard = state.borrow_mut();
        let start = guard.storage.len();
        guard.storage.push(node);
        let saved_path = std::mem::replace(&mut guard.coding_path, path);
        Frame {
            state,
            saved_path,
            start,
        }
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.storage.truncate(self.start);
            state.coding_path = std::mem::take(&mut self.saved_path);
        }
    }
}

/// Decoder reading from a [`Value`](crate::Value) tree.
#[derive(Clone)]
pub(crate) struct TreeDecoder {
    state: Rc<RefCell<DecoderState>>,
    options: Rc<DecoderOptions>,
}

impl TreeDecoder {
    pub(crate) fn new(node: SharedNode, coding_path: CodingPath, options: Rc<DecoderOptions>) -> Self {
        TreeDecoder {
            state: Rc::new(RefCell::new(DecoderState {
                storage: vec![node],
                coding_path,
            })),
            options,
        }
    }

    fn referencing(&self, node: SharedNode, coding_path: CodingPath) -> Box<dyn Decoder> {
        trace!("super decoder created at {coding_path}");
        Box::new(TreeDecoder::new(node, coding_path, self.options.clone()))
    }

    fn current(&self) -> SharedNode {
        self.state
            .borrow()
            .storage
            .last()
            .cloned()
            .unwrap_or_else(SharedNode::null)
    }

    /// Decodes `node` into `place` one level down at `path`.
    fn descend(&self, path: CodingPath, node: SharedNode, place: &mut dyn DecodePlace) -> Result<()> {
        let _frame = Frame::enter(&self.state, path, node);
        let mut decoder = self.clone();
        place.fill(&mut decoder)
    }

    fn keyed_container_for(
        &self,
        node: &SharedNode,
        path: CodingPath,
    ) -> Result<KeyedDecodingContainer<AnyCodingKey>> {
        match node {
            SharedNode::Object(entries) => Ok(KeyedDecodingContainer::new(
                TreeKeyedDecodingContainer::new(self.clone(), entries.clone(), path),
            )),
            other if other.is_null() => Err(DecodingError::ValueNotFound {
                expected: "keyed container",
                context: Context::new(
                    path,
                    "Cannot get keyed decoding container -- found null value instead.",
                ),
            }),
            other => Err(mismatch_named("a dictionary", &path, other)),
        }
    }

    fn unkeyed_container_for(
        &self,
        node: &SharedNode,
        path: CodingPath,
    ) -> Result<UnkeyedDecodingContainer> {
        match node {
            SharedNode::Array(items) => Ok(UnkeyedDecodingContainer::new(
                TreeUnkeyedDecodingContainer {
                    decoder: self.clone(),
                    items: items.clone(),
                    coding_path: path,
                    current_index: 0,
                },
            )),
            other if other.is_null() => Err(DecodingError::ValueNotFound {
                expected: "unkeyed container",
                context: Context::new(
                    path,
                    "Cannot get unkeyed decoding container -- found null value instead.",
                ),
            }),
            other => Err(mismatch_named("an array", &path, other)),
        }
    }
}

impl Decoder for TreeDecoder {
    fn coding_path(&self) -> CodingPath {
        self.state.borrow().coding_path.clone()
    }

    fn user_info(&self) -> &UserInfo {
        &self.options.user_info
    }

    fn keyed_container(&mut self) -> Result<KeyedDecodingContainer<AnyCodingKey>> {
        let path = self.coding_path();
        trace!("keyed decoding container requested at {path}");
        self.keyed_container_for(&self.current(), path)
    }

    fn unkeyed_container(&mut self) -> Result<UnkeyedDecodingContainer> {
        let path = self.coding_path();
        trace!("unkeyed decoding container requested at {path}");
        self.unkeyed_container_for(&self.current(), path)
    }

    fn single_value_container(&mut self) -> Result<SingleValueDecodingContainer> {
        let coding_path = self.coding_path();
        trace!("single value decoding container requested at {coding_path}");
        Ok(SingleValueDecodingContainer::new(
            TreeSingleValueDecodingContainer {
                decoder: self.clone(),
                node: self.current(),
                coding_path,
            },
        ))
    }
}

struct TreeKeyedDecodingContainer {
    decoder: TreeDecoder,
    /// Entries under their keys as stored in the tree.
    raw: Rc<BTreeMap<String, SharedNode>>,
    /// Entries under their keys after the key decoding strategy.
    entries: Rc<BTreeMap<String, SharedNode>>,
    coding_path: CodingPath,
}

impl TreeKeyedDecodingContainer {
    fn new(
        decoder: TreeDecoder,
        entries: Rc<BTreeMap<String, SharedNode>>,
        coding_path: CodingPath,
    ) -> Self {
        let strategy = &decoder.options.key_decoding_strategy;
        let raw = entries.clone();
        let entries = if strategy.is_default() {
            entries
        } else {
            // first converted key in sorted order wins a collision
            let mut converted = BTreeMap::new();
            for (stored, node) in entries.iter() {
                converted
                    .entry(strategy.convert(&coding_path, stored))
                    .or_insert_with(|| node.clone());
            }
            Rc::new(converted)
        };
        TreeKeyedDecodingContainer {
            decoder,
            raw,
            entries,
            coding_path,
        }
    }

    fn entry(&self, key: &AnyCodingKey) -> Result<&SharedNode> {
        self.entries.get(key.string_value()).ok_or_else(|| {
            DecodingError::key_not_found(
                key,
                Context::new(self.coding_path.appending(key), missing_key_description(key)),
            )
        })
    }

    fn options(&self) -> &DecoderOptions {
        &self.decoder.options
    }

    /// A decoder over the entry for `key`, or over null when there is none.
    fn super_decoder_in(
        &self,
        entries: &BTreeMap<String, SharedNode>,
        key: &AnyCodingKey,
    ) -> Box<dyn Decoder> {
        let node = entries
            .get(key.string_value())
            .cloned()
            .unwrap_or_else(SharedNode::null);
        self.decoder
            .referencing(node, self.coding_path.appending(key))
    }
}

macro_rules! keyed_integer_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        fn $method(&self, key: &AnyCodingKey) -> Result<$ty> {
            unbox_integer(self.entry(key)?, &self.coding_path.appending(key))
        }
    )*};
}

impl KeyedDecodingContainerProtocol<AnyCodingKey> for TreeKeyedDecodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.coding_path.clone()
    }

    fn all_keys(&self) -> Vec<AnyCodingKey> {
        self.entries.keys().map(AnyCodingKey::new).collect()
    }

    fn contains(&self, key: &AnyCodingKey) -> bool {
        self.entries.contains_key(key.string_value())
    }

    fn decode_nil(&self, key: &AnyCodingKey) -> Result<bool> {
        Ok(self.entry(key)?.is_null())
    }

    fn decode_bool(&self, key: &AnyCodingKey) -> Result<bool> {
        unbox_bool(self.entry(key)?, &self.coding_path.appending(key))
    }

    keyed_integer_decoders!(
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
    );

    fn decode_f32(&self, key: &AnyCodingKey) -> Result<f32> {
        unbox_f32(
            self.entry(key)?,
            &self.coding_path.appending(key),
            &self.options().non_conforming_float_decoding_strategy,
        )
    }

    fn decode_f64(&self, key: &AnyCodingKey) -> Result<f64> {
        unbox_f64(
            self.entry(key)?,
            &self.coding_path.appending(key),
            &self.options().non_conforming_float_decoding_strategy,
        )
    }

    fn decode_string(&self, key: &AnyCodingKey) -> Result<String> {
        unbox_string(self.entry(key)?, &self.coding_path.appending(key))
    }

    fn decode_value(&self, key: &AnyCodingKey, place: &mut dyn DecodePlace) -> Result<()> {
        let node = self.entry(key)?.clone();
        self.decoder
            .descend(self.coding_path.appending(key), node, place)
    }

    fn nested_container(&self, key: &AnyCodingKey) -> Result<KeyedDecodingContainer<AnyCodingKey>> {
        self.decoder
            .keyed_container_for(self.entry(key)?, self.coding_path.appending(key))
    }

    fn nested_unkeyed_container(&self, key: &AnyCodingKey) -> Result<UnkeyedDecodingContainer> {
        self.decoder
            .unkeyed_container_for(self.entry(key)?, self.coding_path.appending(key))
    }

    fn super_decoder(&self) -> Result<Box<dyn Decoder>> {
        // the reserved key is read verbatim, outside the key strategy
        let super_key = self.options().super_key.clone();
        Ok(self.super_decoder_in(&self.raw, &super_key))
    }

    fn super_decoder_for_key(&self, key: &AnyCodingKey) -> Result<Box<dyn Decoder>> {
        Ok(self.super_decoder_in(&self.entries, key))
    }
}

struct TreeUnkeyedDecodingContainer {
    decoder: TreeDecoder,
    items: Rc<Vec<SharedNode>>,
    coding_path: CodingPath,
    current_index: usize,
}

impl TreeUnkeyedDecodingContainer {
    fn element_path(&self) -> CodingPath {
        self.coding_path
            .appending(&AnyCodingKey::index(self.current_index))
    }

    /// The element under the cursor, or `ValueNotFound` naming `expected`.
    fn current(&self, expected: &'static str) -> Result<SharedNode> {
        self.items
            .get(self.current_index)
            .cloned()
            .ok_or_else(|| DecodingError::ValueNotFound {
                expected,
                context: Context::new(self.element_path(), "Unkeyed container is at end."),
            })
    }

    /// Runs `read` on the current element and advances only if it succeeds.
    fn advance_with<T>(
        &mut self,
        expected: &'static str,
        read: impl FnOnce(&Self, &SharedNode, &CodingPath) -> Result<T>,
    ) -> Result<T> {
        let node = self.current(expected)?;
        let value = read(self, &node, &self.element_path())?;
        self.current_index += 1;
        Ok(value)
    }
}

macro_rules! unkeyed_integer_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        fn $method(&mut self) -> Result<$ty> {
            self.advance_with(stringify!($ty), |_, node, path| unbox_integer(node, path))
        }
    )*};
}

impl UnkeyedDecodingContainerProtocol for TreeUnkeyedDecodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.coding_path.clone()
    }

    fn count(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn is_at_end(&self) -> bool {
        self.current_index >= self.items.len()
    }

    fn current_index(&self) -> usize {
        self.current_index
    }

    fn decode_nil(&mut self) -> Result<bool> {
        if self.current("Option<_>")?.is_null() {
            self.current_index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn decode_bool(&mut self) -> Result<bool> {
        self.advance_with("bool", |_, node, path| unbox_bool(node, path))
    }

    unkeyed_integer_decoders!(
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
    );

    fn decode_f32(&mut self) -> Result<f32> {
        self.advance_with("f32", |this, node, path| {
            unbox_f32(
                node,
                path,
                &this.decoder.options.non_conforming_float_decoding_strategy,
            )
        })
    }

    fn decode_f64(&mut self) -> Result<f64> {
        self.advance_with("f64", |this, node, path| {
            unbox_f64(
                node,
                path,
                &this.decoder.options.non_conforming_float_decoding_strategy,
            )
        })
    }

    fn decode_string(&mut self) -> Result<String> {
        self.advance_with("alloc::string::String", |_, node, path| {
            unbox_string(node, path)
        })
    }

    fn decode_value(&mut self, place: &mut dyn DecodePlace) -> Result<()> {
        let expected = place.type_name();
        self.advance_with(expected, |this, node, path| {
            this.decoder.descend(path.clone(), node.clone(), place)
        })
    }

    fn nested_container(&mut self) -> Result<KeyedDecodingContainer<AnyCodingKey>> {
        self.advance_with("keyed container", |this, node, path| {
            this.decoder.keyed_container_for(node, path.clone())
        })
    }

    fn nested_unkeyed_container(&mut self) -> Result<UnkeyedDecodingContainer> {
        self.advance_with("unkeyed container", |this, node, path| {
            this.decoder.unkeyed_container_for(node, path.clone())
        })
    }

    fn super_decoder(&mut self) -> Result<Box<dyn Decoder>> {
        self.advance_with("super decoder", |this, node, path| {
            Ok(this.decoder.referencing(node.clone(), path.clone()))
        })
    }
}

struct TreeSingleValueDecodingContainer {
    decoder: TreeDecoder,
    node: SharedNode,
    coding_path: CodingPath,
}

macro_rules! single_integer_decoders {
    ($($method:ident -> $ty:ty),* $(,)?) => {$(
        fn $method(&self) -> Result<$ty> {
            unbox_integer(&self.node, &self.coding_path)
        }
    )*};
}

impl SingleValueDecodingContainerProtocol for TreeSingleValueDecodingContainer {
    fn coding_path(&self) -> CodingPath {
        self.coding_path.clone()
    }

    fn decode_nil(&self) -> bool {
        self.node.is_null()
    }

    fn decode_bool(&self) -> Result<bool> {
        unbox_bool(&self.node, &self.coding_path)
    }

    single_integer_decoders!(
        decode_i8 -> i8,
        decode_i16 -> i16,
        decode_i32 -> i32,
        decode_i64 -> i64,
        decode_u8 -> u8,
        decode_u16 -> u16,
        decode_u32 -> u32,
        decode_u64 -> u64,
    );

    fn decode_f32(&self) -> Result<f32> {
        unbox_f32(
            &self.node,
            &self.coding_path,
            &self.decoder.options.non_conforming_float_decoding_strategy,
        )
    }

    fn decode_f64(&self) -> Result<f64> {
        unbox_f64(
            &self.node,
            &self.coding_path,
            &self.decoder.options.non_conforming_float_decoding_strategy,
        )
    }

    fn decode_string(&self) -> Result<String> {
        unbox_string(&self.node, &self.coding_path)
    }

    fn decode_value(&self, place: &mut dyn DecodePlace) -> Result<()> {
        self.decoder
            .descend(self.coding_path.clone(), self.node.clone(), place)
    }
}
