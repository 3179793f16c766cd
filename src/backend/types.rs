//! Typed views of the raw device enumerants

use super::consts;
use crate::error::{Error, Result};

/// Declares a closed enum over raw enumerants with `to_raw`/`from_raw`
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($what:literal) {
            $($(#[$vmeta:meta])* $variant:ident = $raw:path),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn to_raw(self) -> u32 {
                match self {
                    $($name::$variant => $raw),+
                }
            }

            pub fn from_raw(raw: u32) -> Result<Self> {
                $(if raw == $raw {
                    return Ok($name::$variant);
                })+
                Err(Error::UnknownEnum { what: $what, value: raw })
            }
        }
    };
}

raw_enum! {
    /// Component type of vertex, index and pixel data
    pub enum DataType("data type") {
        Byte = consts::BYTE,
        UnsignedByte = consts::UNSIGNED_BYTE,
        Short = consts::SHORT,
        UnsignedShort = consts::UNSIGNED_SHORT,
        Int = consts::INT,
        UnsignedInt = consts::UNSIGNED_INT,
        Float = consts::FLOAT,
        HalfFloat = consts::HALF_FLOAT,
    }
}

impl DataType {
    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort | DataType::HalfFloat => 2,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 4,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, DataType::Float | DataType::HalfFloat)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Byte => "i8",
            DataType::UnsignedByte => "u8",
            DataType::Short => "i16",
            DataType::UnsignedShort => "u16",
            DataType::Int => "i32",
            DataType::UnsignedInt => "u32",
            DataType::Float => "f32",
            DataType::HalfFloat => "f16",
        }
    }
}

raw_enum! {
    /// Buffer binding point
    pub enum BufferTarget("buffer target") {
        Array = consts::ARRAY_BUFFER,
        ElementArray = consts::ELEMENT_ARRAY_BUFFER,
        CopyRead = consts::COPY_READ_BUFFER,
        CopyWrite = consts::COPY_WRITE_BUFFER,
        TransformFeedback = consts::TRANSFORM_FEEDBACK_BUFFER,
        Uniform = consts::UNIFORM_BUFFER,
        PixelPack = consts::PIXEL_PACK_BUFFER,
        PixelUnpack = consts::PIXEL_UNPACK_BUFFER,
    }
}

raw_enum! {
    /// Usage hint passed with buffer uploads
    pub enum BufferUsage("buffer usage") {
        StaticDraw = consts::STATIC_DRAW,
        StaticRead = consts::STATIC_READ,
        StaticCopy = consts::STATIC_COPY,
        DynamicDraw = consts::DYNAMIC_DRAW,
        DynamicRead = consts::DYNAMIC_READ,
        DynamicCopy = consts::DYNAMIC_COPY,
        StreamDraw = consts::STREAM_DRAW,
        StreamRead = consts::STREAM_READ,
        StreamCopy = consts::STREAM_COPY,
    }
}

raw_enum! {
    /// Texture binding point
    pub enum TextureTarget("texture target") {
        Texture2D = consts::TEXTURE_2D,
        Texture3D = consts::TEXTURE_3D,
        CubeMap = consts::TEXTURE_CUBE_MAP,
        Texture2DArray = consts::TEXTURE_2D_ARRAY,
    }
}

raw_enum! {
    /// Programmable stage
    pub enum ShaderStage("shader stage") {
        Vertex = consts::VERTEX_SHADER,
        Fragment = consts::FRAGMENT_SHADER,
    }
}

raw_enum! {
    /// Global enable/disable flags
    pub enum Capability("capability") {
        Blend = consts::BLEND,
        CullFace = consts::CULL_FACE,
        DepthTest = consts::DEPTH_TEST,
        Dither = consts::DITHER,
        PolygonOffsetFill = consts::POLYGON_OFFSET_FILL,
        SampleAlphaToCoverage = consts::SAMPLE_ALPHA_TO_COVERAGE,
        SampleCoverage = consts::SAMPLE_COVERAGE,
        ScissorTest = consts::SCISSOR_TEST,
        StencilTest = consts::STENCIL_TEST,
        RasterizerDiscard = consts::RASTERIZER_DISCARD,
    }
}

impl Capability {
    /// Dense index into per-capability tables
    pub fn index(self) -> usize {
        self as usize
    }
}

raw_enum! {
    /// Compare function for depth/stencil
    pub enum CompareFunction("compare function") {
        Never = consts::NEVER,
        Less = consts::LESS,
        Equal = consts::EQUAL,
        LessEqual = consts::LEQUAL,
        Greater = consts::GREATER,
        NotEqual = consts::NOTEQUAL,
        GreaterEqual = consts::GEQUAL,
        Always = consts::ALWAYS,
    }
}

raw_enum! {
    /// Stencil buffer operation
    pub enum StencilOp("stencil operation") {
        Zero = consts::ZERO,
        Keep = consts::KEEP,
        Replace = consts::REPLACE,
        Increment = consts::INCR,
        Decrement = consts::DECR,
        Invert = consts::INVERT,
        IncrementWrap = consts::INCR_WRAP,
        DecrementWrap = consts::DECR_WRAP,
    }
}

raw_enum! {
    /// Blend factor
    pub enum BlendFactor("blend factor") {
        Zero = consts::ZERO,
        One = consts::ONE,
        SrcColor = consts::SRC_COLOR,
        OneMinusSrcColor = consts::ONE_MINUS_SRC_COLOR,
        SrcAlpha = consts::SRC_ALPHA,
        OneMinusSrcAlpha = consts::ONE_MINUS_SRC_ALPHA,
        DstAlpha = consts::DST_ALPHA,
        OneMinusDstAlpha = consts::ONE_MINUS_DST_ALPHA,
        DstColor = consts::DST_COLOR,
        OneMinusDstColor = consts::ONE_MINUS_DST_COLOR,
        SrcAlphaSaturate = consts::SRC_ALPHA_SATURATE,
        ConstantColor = consts::CONSTANT_COLOR,
        OneMinusConstantColor = consts::ONE_MINUS_CONSTANT_COLOR,
        ConstantAlpha = consts::CONSTANT_ALPHA,
        OneMinusConstantAlpha = consts::ONE_MINUS_CONSTANT_ALPHA,
    }
}

raw_enum! {
    /// Blend operation
    pub enum BlendEquation("blend equation") {
        Add = consts::FUNC_ADD,
        Subtract = consts::FUNC_SUBTRACT,
        ReverseSubtract = consts::FUNC_REVERSE_SUBTRACT,
        Min = consts::MIN,
        Max = consts::MAX,
    }
}

raw_enum! {
    /// Polygon face addressed by per-face stencil state
    pub enum Face("face") {
        Front = consts::FRONT,
        Back = consts::BACK,
    }
}

raw_enum! {
    /// Faces removed by culling
    pub enum CullFace("cull face mode") {
        Front = consts::FRONT,
        Back = consts::BACK,
        FrontAndBack = consts::FRONT_AND_BACK,
    }
}

raw_enum! {
    /// Front face winding
    pub enum FrontFace("front face") {
        Cw = consts::CW,
        Ccw = consts::CCW,
    }
}

raw_enum! {
    /// Primitive assembly mode
    pub enum DrawMode("draw mode") {
        Points = consts::POINTS,
        Lines = consts::LINES,
        LineLoop = consts::LINE_LOOP,
        LineStrip = consts::LINE_STRIP,
        Triangles = consts::TRIANGLES,
        TriangleStrip = consts::TRIANGLE_STRIP,
        TriangleFan = consts::TRIANGLE_FAN,
    }
}

raw_enum! {
    /// Texture minification/magnification filter
    pub enum TextureFilter("texture filter") {
        Nearest = consts::NEAREST,
        Linear = consts::LINEAR,
        NearestMipmapNearest = consts::NEAREST_MIPMAP_NEAREST,
        LinearMipmapNearest = consts::LINEAR_MIPMAP_NEAREST,
        NearestMipmapLinear = consts::NEAREST_MIPMAP_LINEAR,
        LinearMipmapLinear = consts::LINEAR_MIPMAP_LINEAR,
    }
}

raw_enum! {
    /// Texture coordinate wrapping
    pub enum TextureWrap("texture wrap") {
        Repeat = consts::REPEAT,
        ClampToEdge = consts::CLAMP_TO_EDGE,
        MirroredRepeat = consts::MIRRORED_REPEAT,
    }
}

raw_enum! {
    /// Pixel transfer parameter set through `pixel_store_i32`
    pub enum PixelStoreParameter("pixel store parameter") {
        PackAlignment = consts::PACK_ALIGNMENT,
        PackRowLength = consts::PACK_ROW_LENGTH,
        PackSkipPixels = consts::PACK_SKIP_PIXELS,
        PackSkipRows = consts::PACK_SKIP_ROWS,
        UnpackAlignment = consts::UNPACK_ALIGNMENT,
        UnpackRowLength = consts::UNPACK_ROW_LENGTH,
        UnpackImageHeight = consts::UNPACK_IMAGE_HEIGHT,
        UnpackSkipPixels = consts::UNPACK_SKIP_PIXELS,
        UnpackSkipRows = consts::UNPACK_SKIP_ROWS,
        UnpackSkipImages = consts::UNPACK_SKIP_IMAGES,
        UnpackFlipY = consts::UNPACK_FLIP_Y_WEBGL,
        UnpackPremultiplyAlpha = consts::UNPACK_PREMULTIPLY_ALPHA_WEBGL,
        UnpackColorspaceConversion = consts::UNPACK_COLORSPACE_CONVERSION_WEBGL,
    }
}

impl PixelStoreParameter {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Sized internal texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Srgb8Alpha8,
    R16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    R32Sint,
    R32Uint,
    Rgba8Uint,
    Depth16,
    Depth24,
    Depth32Float,
    Depth24Stencil8,
}

impl TextureFormat {
    pub fn internal_format(self) -> u32 {
        match self {
            TextureFormat::R8 => consts::R8,
            TextureFormat::Rg8 => consts::RG8,
            TextureFormat::Rgb8 => consts::RGB8,
            TextureFormat::Rgba8 => consts::RGBA8,
            TextureFormat::Srgb8Alpha8 => consts::SRGB8_ALPHA8,
            TextureFormat::R16Float => consts::R16F,
            TextureFormat::Rgba16Float => consts::RGBA16F,
            TextureFormat::R32Float => consts::R32F,
            TextureFormat::Rg32Float => consts::RG32F,
            TextureFormat::Rgba32Float => consts::RGBA32F,
            TextureFormat::R32Sint => consts::R32I,
            TextureFormat::R32Uint => consts::R32UI,
            TextureFormat::Rgba8Uint => consts::RGBA8UI,
            TextureFormat::Depth16 => consts::DEPTH_COMPONENT16,
            TextureFormat::Depth24 => consts::DEPTH_COMPONENT24,
            TextureFormat::Depth32Float => consts::DEPTH_COMPONENT32F,
            TextureFormat::Depth24Stencil8 => consts::DEPTH24_STENCIL8,
        }
    }

    /// Unsized pixel format of host data
    pub fn pixel_format(self) -> u32 {
        match self {
            TextureFormat::R8 | TextureFormat::R16Float | TextureFormat::R32Float => consts::RED,
            TextureFormat::Rg8 | TextureFormat::Rg32Float => consts::RG,
            TextureFormat::Rgb8 => consts::RGB,
            TextureFormat::Rgba8
            | TextureFormat::Srgb8Alpha8
            | TextureFormat::Rgba16Float
            | TextureFormat::Rgba32Float => consts::RGBA,
            TextureFormat::R32Sint | TextureFormat::R32Uint => consts::RED_INTEGER,
            TextureFormat::Rgba8Uint => consts::RGBA_INTEGER,
            TextureFormat::Depth16 | TextureFormat::Depth24 | TextureFormat::Depth32Float => {
                consts::DEPTH_COMPONENT
            }
            TextureFormat::Depth24Stencil8 => consts::DEPTH_STENCIL,
        }
    }

    /// Components per pixel in host data
    pub fn channels(self) -> usize {
        match self {
            TextureFormat::R8
            | TextureFormat::R16Float
            | TextureFormat::R32Float
            | TextureFormat::R32Sint
            | TextureFormat::R32Uint
            | TextureFormat::Depth16
            | TextureFormat::Depth24
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24Stencil8 => 1,
            TextureFormat::Rg8 | TextureFormat::Rg32Float => 2,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8
            | TextureFormat::Srgb8Alpha8
            | TextureFormat::Rgba16Float
            | TextureFormat::Rgba32Float
            | TextureFormat::Rgba8Uint => 4,
        }
    }

    /// Host component types the device accepts for this format
    pub fn pixel_types(self) -> &'static [DataType] {
        match self {
            TextureFormat::R8
            | TextureFormat::Rg8
            | TextureFormat::Rgb8
            | TextureFormat::Rgba8
            | TextureFormat::Srgb8Alpha8
            | TextureFormat::Rgba8Uint => &[DataType::UnsignedByte],
            TextureFormat::R16Float | TextureFormat::Rgba16Float => {
                &[DataType::HalfFloat, DataType::Float]
            }
            TextureFormat::R32Float
            | TextureFormat::Rg32Float
            | TextureFormat::Rgba32Float
            | TextureFormat::Depth32Float => &[DataType::Float],
            TextureFormat::R32Sint => &[DataType::Int],
            TextureFormat::R32Uint => &[DataType::UnsignedInt],
            TextureFormat::Depth16 => &[DataType::UnsignedShort, DataType::UnsignedInt],
            TextureFormat::Depth24 => &[DataType::UnsignedInt],
            // Packed 24/8 data has no host element type
            TextureFormat::Depth24Stencil8 => &[],
        }
    }

    /// Pixel type used when allocating storage without data
    pub fn default_pixel_type(self) -> u32 {
        match self {
            TextureFormat::Depth24Stencil8 => consts::UNSIGNED_INT_24_8,
            other => other.pixel_types()[0].to_raw(),
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16
                | TextureFormat::Depth24
                | TextureFormat::Depth32Float
                | TextureFormat::Depth24Stencil8
        )
    }
}

/// Buffers cleared by [`crate::RenderingContext::clear`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask(u32);

impl ClearMask {
    pub const COLOR: Self = Self(consts::COLOR_BUFFER_BIT);
    pub const DEPTH: Self = Self(consts::DEPTH_BUFFER_BIT);
    pub const STENCIL: Self = Self(consts::STENCIL_BUFFER_BIT);
    pub const ALL: Self =
        Self(consts::COLOR_BUFFER_BIT | consts::DEPTH_BUFFER_BIT | consts::STENCIL_BUFFER_BIT);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for ClearMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Integer window rectangle (viewport, scissor box)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub(crate) fn from_array(values: [i32; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}
