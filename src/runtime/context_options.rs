use serde_derive::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    Default,
    HighPerformance,
    LowPower,
}

impl Default for PowerPreference {
    fn default() -> Self {
        PowerPreference::Default
    }
}

/// Configures a rendering context.
///
/// The first group of options is handed to the browser when the WebGL 2.0 context is obtained
/// (see the `webgl2` runtime); they are ignored by the headless backend. The remaining options
/// configure the program builder and binding layer itself:
///
/// - `detach_shaders_after_link`: when enabled, a successfully linked program detaches and
///   releases its two shaders right away. When disabled (the default) the program keeps owning
///   them until it is dropped.
/// - `strict_uniforms`: when enabled, a draw call fails if the active program reads uniforms
///   that were not set since the program became active. When disabled (the default) this is only
///   logged, and such uniforms keep whatever value the program last held.
///
/// Construct options with the builder:
///
/// ```
/// use web_shade::runtime::ContextOptions;
///
/// let options = ContextOptions::begin()
///     .enable_depth()
///     .strict_uniforms(true)
///     .finish();
///
/// assert!(options.depth());
/// assert!(options.strict_uniforms());
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ContextOptions {
    attributes: ContextAttributes,
    detach_shaders_after_link: bool,
    strict_uniforms: bool,
}

impl ContextOptions {
    pub fn begin() -> ContextOptionsBuilder {
        ContextOptionsBuilder {
            options: ContextOptions::default(),
        }
    }

    pub fn alpha(&self) -> bool {
        self.attributes.alpha
    }

    pub fn antialias(&self) -> bool {
        self.attributes.antialias
    }

    pub fn depth(&self) -> bool {
        self.attributes.depth
    }

    pub fn stencil(&self) -> bool {
        self.attributes.stencil
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.attributes.premultiplied_alpha
    }

    pub fn preserve_drawing_buffer(&self) -> bool {
        self.attributes.preserve_drawing_buffer
    }

    pub fn fail_if_major_performance_caveat(&self) -> bool {
        self.attributes.fail_if_major_performance_caveat
    }

    pub fn power_preference(&self) -> PowerPreference {
        self.attributes.power_preference
    }

    pub fn detach_shaders_after_link(&self) -> bool {
        self.detach_shaders_after_link
    }

    pub fn strict_uniforms(&self) -> bool {
        self.strict_uniforms
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    pub(crate) fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            attributes: ContextAttributes {
                alpha: true,
                antialias: true,
                depth: false,
                stencil: false,
                premultiplied_alpha: true,
                preserve_drawing_buffer: false,
                fail_if_major_performance_caveat: false,
                power_preference: PowerPreference::default(),
            },
            detach_shaders_after_link: false,
            strict_uniforms: false,
        }
    }
}

pub struct ContextOptionsBuilder {
    options: ContextOptions,
}

impl ContextOptionsBuilder {
    pub fn disable_alpha(mut self) -> Self {
        self.options.attributes.alpha = false;

        self
    }

    pub fn disable_antialias(mut self) -> Self {
        self.options.attributes.antialias = false;

        self
    }

    pub fn enable_depth(mut self) -> Self {
        self.options.attributes.depth = true;

        self
    }

    pub fn enable_stencil(mut self) -> Self {
        self.options.attributes.stencil = true;

        self
    }

    pub fn premultiplied_alpha(mut self, premultiplied_alpha: bool) -> Self {
        self.options.attributes.premultiplied_alpha = premultiplied_alpha;

        self
    }

    pub fn preserve_drawing_buffer(mut self, preserve_drawing_buffer: bool) -> Self {
        self.options.attributes.preserve_drawing_buffer = preserve_drawing_buffer;

        self
    }

    pub fn fail_if_major_performance_caveat(
        mut self,
        fail_if_major_performance_caveat: bool,
    ) -> Self {
        self.options.attributes.fail_if_major_performance_caveat =
            fail_if_major_performance_caveat;

        self
    }

    pub fn power_preference(mut self, power_preference: PowerPreference) -> Self {
        self.options.attributes.power_preference = power_preference;

        self
    }

    pub fn detach_shaders_after_link(mut self, detach_shaders_after_link: bool) -> Self {
        self.options.detach_shaders_after_link = detach_shaders_after_link;

        self
    }

    pub fn strict_uniforms(mut self, strict_uniforms: bool) -> Self {
        self.options.strict_uniforms = strict_uniforms;

        self
    }

    pub fn finish(self) -> ContextOptions {
        self.options
    }
}

/// The context creation attributes, in the shape `HTMLCanvasElement.getContext` expects.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContextAttributes {
    alpha: bool,
    antialias: bool,
    depth: bool,
    stencil: bool,
    premultiplied_alpha: bool,
    preserve_drawing_buffer: bool,
    fail_if_major_performance_caveat: bool,
    power_preference: PowerPreference,
}
