//! Swift idiom dictionaries.
//!
//! Each [`PatternFamily`] maps a category name to a regular expression.
//! Scanning a file yields the distinct matched terms per category: capture
//! group 1 when the expression has one, else the whole match.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// A compiled category regex.
#[derive(Debug)]
pub struct Pattern {
    pub category: &'static str,
    regex: Regex,
    /// Drop matches that end directly against `self` with no whitespace
    /// left to give back.
    not_before_self: bool,
}

impl Pattern {
    pub fn find_terms(&self, content: &str) -> BTreeSet<String> {
        let grouped = self.regex.captures_len() > 1;
        let mut terms = BTreeSet::new();

        for caps in self.regex.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            let mut end = whole.end();
            if self.not_before_self && content[end..].starts_with("self") {
                // Give back one trailing whitespace char, or reject when the
                // match ends right against `self`.
                match whole.as_str().chars().next_back() {
                    Some(c) if c.is_whitespace() => end -= c.len_utf8(),
                    _ => continue,
                }
            }
            let term = if grouped {
                caps.get(1).map(|m| m.as_str())
            } else {
                Some(&content[whole.start()..end])
            };
            if let Some(term) = term {
                terms.insert(term.to_string());
            }
        }
        terms
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[derive(Debug)]
pub struct PatternFamily {
    pub name: &'static str,
    patterns: Vec<Pattern>,
}

impl PatternFamily {
    fn compile(name: &'static str, defs: &[PatternDef]) -> Self {
        let patterns = defs
            .iter()
            .map(|def| Pattern {
                category: def.category,
                regex: Regex::new(def.pattern).unwrap(),
                not_before_self: def.not_before_self,
            })
            .collect();
        Self { name, patterns }
    }

    /// Matched terms for every category, in declaration order. Categories
    /// without hits are included with an empty set.
    pub fn scan(&self, content: &str) -> Vec<(&'static str, BTreeSet<String>)> {
        self.patterns
            .iter()
            .map(|p| (p.category, p.find_terms(content)))
            .collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.patterns.iter().map(|p| p.category)
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn get(&self, category: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.category == category)
    }
}

struct PatternDef {
    category: &'static str,
    pattern: &'static str,
    not_before_self: bool,
}

const fn p(category: &'static str, pattern: &'static str) -> PatternDef {
    PatternDef { category, pattern, not_before_self: false }
}

const fn guarded(category: &'static str, pattern: &'static str) -> PatternDef {
    PatternDef { category, pattern, not_before_self: true }
}

pub static IMPORTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"import\s+(\w+)").unwrap());

/// `import X` module names in `content`.
pub fn imports_of(content: &str) -> BTreeSet<String> {
    IMPORTS
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

const UI: &[PatternDef] = &[
    p("navigation", r"(?:NavigationStack|NavigationSplitView|NavigationLink)\b"),
    p("windows", r"(?:WindowGroup|VolumetricWindow|ImmersiveSpace)\b"),
    p("controls", r"(?:Button|Toggle|Slider|Picker)\b"),
    p("layout", r"(?:HStack|VStack|Grid|LazyVGrid)\b"),
    p("ornaments", r"(?:\.ornament|\.toolbar|\.windowStyle)\b"),
    p("media", r"(?:VideoPlayer|AVPlayer|SpatialPlayer)\b"),
];

const STATE: &[PatternDef] = &[
    p(
        "property_wrappers",
        r"@(?:State|StateObject|ObservedObject|EnvironmentObject|Binding|Environment|Published|Observable)\b",
    ),
    p("environment", r"\.environment\(\s*\\\.[\w.]+\s*\)"),
    p("bindings", r"@Binding\s+var\s+\w+"),
    p("observation", r"@(?:Observable|Observation)\s+class"),
];

const LIFECYCLE: &[PatternDef] = &[
    p("view_lifecycle", r"\.(?:onAppear|onDisappear|task|onChange)\s*[({]"),
    p("async_patterns", r"@MainActor|async\s+func|await\s+"),
    p("tasks", r"Task\s*[{]|\.task\s*[{]"),
    p("phase_handling", r"\.phase\b|PhaseAnimator|ContentTransition"),
];

const UPDATE: &[PatternDef] = &[
    p("reality_view", r"RealityView\s*[{]\s*[^}]*(?:content|update|attachments)\s+in\b"),
    p("system_updates", r"func\s+update\s*\([^)]*\)\s*(?:async\s+)?[{]"),
    p("animation_updates", r"\.animation\s*\([^)]*\)|withAnimation\s*[{]"),
];

const REALITY_COMPOSER: &[PatternDef] = &[
    p(
        "behaviors",
        r"(?:Behavior|BehaviorComponent|BehaviorValue|InputTarget|BehaviorSystem|BehaviorDefinition|BehaviorEvents)\b",
    ),
    p(
        "timelines",
        r"(?:Timeline|AnimationTimeline|TimelineAnimation|PlaybackController|TimelineAsset|TimelineDefinition|TimelineEvents)\b",
    ),
    p(
        "shader_graph",
        r"(?:ShaderGraphMaterial|CustomMaterial|MaterialParameters|ShaderFunction|MaterialPropertyBlock|ShaderDefinition|ShaderEvents)\b",
    ),
    p(
        "custom_systems",
        r"(?:SystemComponent|SystemRegistry|ComponentSystem|UpdateSystem|SystemTraits|SystemDefinition|SystemEvents)\b",
    ),
    p(
        "assets",
        r"\.usda\b|\.usdz\b|\.rcproject\b|\.reality\b|\.materialx\b|\.shadergraph\b|\.behavior\b|\.timeline\b",
    ),
    p(
        "physics",
        r"(?:PhysicsBody|PhysicsMotion|PhysicsMaterial|PhysicsSimulation|DynamicBody|StaticBody|KinematicBody|PhysicsDefinition|PhysicsEvents)\b",
    ),
    p(
        "collisions",
        r"(?:CollisionComponent|TriggerComponent|ContactEventHandler|CollisionFilter|CollisionShape|CollisionMask|CollisionDefinition|CollisionEvents)\b",
    ),
    p(
        "forces",
        r"(?:PhysicsForce|GravityModifier|ForceField|ImpulseForce|TorqueForce|ConstantForce|ForceDefinition|ForceEvents)\b",
    ),
    p(
        "components",
        r"(?:ModelComponent|TransformComponent|SceneComponent|InputTargetComponent|PhysicsBodyComponent|CollisionComponent|ComponentDefinition|ComponentEvents)\b",
    ),
    p(
        "input_handling",
        r"(?:InputTargetHandler|GestureRecognizer|TargetComponent|InputDevice|InputSystem|InputDefinition|InputEvents)\b",
    ),
    p(
        "scene_graph",
        r"(?:SceneGraph|ParentEntity|ChildEntity|EntityContainer|SceneSystem|EntityQuery|SceneDefinition|SceneEvents)\b",
    ),
    p(
        "simulation",
        r"(?:SimulationSystem|SimulationState|SimulationComponent|PhysicsSimulation|ParticleSimulation|SimulationDefinition|SimulationEvents)\b",
    ),
    p(
        "particles",
        r"(?:ParticleSystem|ParticleEmitter|ParticleModifier|EmissionShape|ParticleProperties|ParticleDefinition|ParticleEvents)\b",
    ),
    p(
        "constraints",
        r"(?:PhysicsConstraint|JointConstraint|FixedConstraint|HingeConstraint|SpringConstraint|ConstraintDefinition|ConstraintEvents)\b",
    ),
    p(
        "events",
        r"(?:EventHandler|EventSystem|EventComponent|EventDefinition|EventTrigger|EventResponse|EventQueue|EventDispatcher)\b",
    ),
    p(
        "actions",
        r"(?:ActionSystem|ActionComponent|ActionDefinition|ActionHandler|ActionResponse|ActionQueue|ActionDispatcher)\b",
    ),
    p(
        "property_changes",
        r"(?:setPropertyValue|setMaterialProperty|setShaderParameter|setTextureProperty|setAnimationProperty|setPhysicsProperty)\s*\(",
    ),
    p(
        "dynamic_properties",
        r"\.(?:materialParameters|shaderParameters|animationParameters|behaviorParameters|physicsParameters|sceneParameters)\s*[=.]",
    ),
    p("property_bindings", r#"\.bind\s*\(\s*["']\w+["']\s*,\s*to:"#),
    p("triggers", r"(?:addTrigger|removeTrigger|enableTrigger|disableTrigger|TriggerCondition)\b"),
    p("trigger_conditions", r"\.(?:when|onTrigger|triggerWhen|triggerOnCondition)\s*[({]"),
    p("trigger_actions", r"\.(?:then|perform|execute|triggerAction)\s*[({]"),
    p(
        "scene_changes",
        r"(?:modifyEntity|updateScene|updateMaterials|updateBehaviors|updatePhysics|updateComponents)\b",
    ),
    p(
        "runtime_updates",
        r"\.(?:updatePropertyValue|updateMaterial|updateBehavior|updateAnimation|updatePhysics|updateComponent)\s*[({]",
    ),
    p(
        "state_changes",
        r"\.(?:setState|setMode|setConfiguration|setParameters|setProperties|setAttributes)\s*[({]",
    ),
    p(
        "scene_components",
        r"(?:SceneComponent|SceneModifier|SceneModification|SceneUpdate|SceneConfiguration)\b",
    ),
    p("component_updates", r"(?:updateComponent|modifyComponent|configureComponent|setupComponent)\s*[({]"),
    p(
        "component_properties",
        r"\.(?:componentProperties|componentParameters|componentConfiguration|componentAttributes)\s*[=.]",
    ),
    p("material_updates", r"(?:updateMaterial|modifyMaterial|configureMaterial|setupMaterial)\s*[({]"),
    p(
        "material_properties",
        r"\.(?:materialProperties|materialParameters|materialConfiguration|materialAttributes)\s*[=.]",
    ),
    p("shader_updates", r"(?:updateShader|modifyShader|configureShader|setupShader)\s*[({]"),
];

/// File-level relationship detectors. A file counts for a relationship when
/// its expression matches anywhere.
const RCP_RELATIONSHIPS: &[PatternDef] = &[
    p("behavior_timeline", r"(?:Behavior|BehaviorComponent).+?Timeline"),
    p("shader_material", r"(?:ShaderGraphMaterial|CustomMaterial).+?Entity"),
    p("asset_references", r#"try\s+await\s+Entity\s*\(\s*named:\s*["']\w+["']"#),
    p("physics_collision", r"(?:PhysicsBody|PhysicsMotion).+?(?:Collision|Contact)"),
    p("component_physics", r"(?:ModelComponent|TransformComponent).+?Physics"),
    p("input_behavior", r"(?:InputTarget|GestureRecognizer).+?Behavior"),
    p("simulation_constraint", r"(?:Simulation|Physics).+?Constraint"),
    p("particle_material", r"(?:ParticleSystem|ParticleEmitter).+?Material"),
    p("event_trigger", r"(?:Event|Trigger).+?(?:Handler|Response)"),
    p("action_event", r"(?:Action|Response).+?(?:Event|Trigger)"),
    p("component_event", r"(?:Component|System).+?(?:Event|Trigger)"),
    p("property_trigger", r"(?:Property|Parameter).+?(?:Trigger|Condition)"),
    p("trigger_action", r"(?:Trigger|Condition).+?(?:Action|Response)"),
    p("property_animation", r"(?:Property|Parameter).+?(?:Animation|Timeline)"),
    p("property_update", r"(?:Property|Parameter).+?(?:Update|Change)"),
    p("scene_update", r"(?:Scene|Entity).+?(?:Update|Modify)"),
    p("material_update", r"(?:Material|Shader).+?(?:Update|Change)"),
    p("property_scene", r"(?:Property|Parameter).+?(?:Scene|Entity)"),
    p("material_scene", r"(?:Material|Shader).+?(?:Scene|Entity)"),
    p("component_scene", r"(?:Component|System).+?(?:Scene|Entity)"),
    p("component_update", r"(?:Component|System).+?(?:Update|Change)"),
];

const SCENE_MODIFICATION: &[PatternDef] = &[
    p(
        "property_changes",
        r"(?:\.transform\s*=|\.position\s*=|\.scale\s*=|\.rotation\s*=|\.orientation\s*=|\.eulerAngles\s*=|\.quaternion\s*=|\.localPosition\s*=|\.worldPosition\s*=)",
    ),
    p(
        "material_changes",
        r"(?:\.material\s*=|\.materials\s*=|\.baseColor\s*=|\.roughness\s*=|\.metallic\s*=|\.opacity\s*=|\.normal\s*=|\.emissive\s*=|\.materialParameters\s*=|\.shaderParameters\s*=)",
    ),
    p(
        "animation_changes",
        r"(?:\.speed\s*=|\.duration\s*=|\.repeatCount\s*=|\.autoreverses\s*=|\.isPlaying\s*=|\.currentTime\s*=|\.animationParameters\s*=|\.playbackRate\s*=)",
    ),
    p(
        "physics_changes",
        r"(?:\.mass\s*=|\.friction\s*=|\.restitution\s*=|\.velocity\s*=|\.angularVelocity\s*=|\.isAffectedByGravity\s*=|\.physicsParameters\s*=|\.collisionFilter\s*=)",
    ),
    p("reality_updates", r"RealityView\s*[{]\s*[^}]*(?:content|attachments)\s+in[^}]+?update:"),
    p("system_updates", r"func\s+update\s*\([^)]*\)\s*(?:async\s+)?[{]"),
    p(
        "component_updates",
        r"(?:updateComponent|modifyComponent|configureComponent|setupComponent|updateProperties|updateParameters)\s*[({]",
    ),
    p(
        "timeline_updates",
        r"(?:updateTimeline|modifyTimeline|configureTimeline|updateAnimation|setTime|updatePlayback)\s*[({]",
    ),
    p(
        "behavior_updates",
        r"(?:updateBehavior|modifyBehavior|configureBehavior|triggerBehavior|setBehaviorState|updateBehaviorState)\s*[({]",
    ),
    p(
        "hierarchy_changes",
        r"(?:addChild|removeFromParent|moveToParent|replaceChild|insertChild|reparent|reorderChild)\s*[({]",
    ),
    p(
        "entity_changes",
        r"(?:addEntity|removeEntity|replaceEntity|createEntity|destroyEntity|spawnEntity|cloneEntity)\s*[({]",
    ),
    p(
        "scene_traversal",
        r"(?:findEntity|findChild|findParent|findAncestor|findDescendant|findByName|findByType|findByComponent)\s*[({]",
    ),
    p("state_bindings", r"@Binding\s+var\s+\w+\s*:"),
    p("observable_changes", r"@Observable\s+(?:class|struct)\s+\w+"),
    p("environment_changes", r"@Environment\s*\(\s*\\\.[\w.]+\s*\)"),
    p(
        "component_state",
        r"(?:\.isEnabled\s*=|\.isActive\s*=|\.state\s*=|\.mode\s*=|\.configuration\s*=|\.parameters\s*=|\.settings\s*=)",
    ),
    p(
        "component_properties",
        r"(?:\.properties\s*=|\.parameters\s*=|\.attributes\s*=|\.settings\s*=|\.configuration\s*=)",
    ),
    p(
        "component_events",
        r"(?:\.onEvent\s*[{]|\.handleEvent\s*[{]|\.triggerEvent\s*[{]|\.eventHandler\s*=)",
    ),
    p(
        "rcp_material_updates",
        r"(?:updateMaterial|modifyMaterial|configureMaterial|setMaterialParameters|updateShaderParameters)\s*[({]",
    ),
    p(
        "rcp_behavior_updates",
        r"(?:updateBehavior|modifyBehavior|configureBehavior|setBehaviorParameters|updateBehaviorState)\s*[({]",
    ),
    p(
        "rcp_animation_updates",
        r"(?:updateAnimation|modifyAnimation|configureAnimation|setAnimationParameters|updateAnimationState)\s*[({]",
    ),
    p(
        "rcp_physics_updates",
        r"(?:updatePhysics|modifyPhysics|configurePhysics|setPhysicsParameters|updatePhysicsState)\s*[({]",
    ),
    p(
        "rcp_component_updates",
        r"(?:updateComponent|modifyComponent|configureComponent|setComponentParameters|updateComponentState)\s*[({]",
    ),
];

const STATE_MANAGEMENT: &[PatternDef] = &[
    p(
        "state_properties",
        r"@(?:State|StateObject|ObservedObject|Published|Observable|Binding)\s+(?:private\s+)?var\s+\w+",
    ),
    p("state_access", r"(?:\$\w+|\w+\.wrappedValue|\w+\.projectedValue)"),
    guarded("state_updates", r"(?:self\.)?(\w+)\s*=\s*"),
    p("environment_values", r"@Environment\(\\\.\w+\)\s+(?:private\s+)?var\s+\w+"),
    p("environment_objects", r"@EnvironmentObject\s+(?:private\s+)?var\s+\w+"),
    p("environment_updates", r"\.environment\(\s*\\\.[\w.]+\s*,\s*[\w.]+\)"),
    p("observable_types", r"@Observable\s+(?:final\s+)?(?:class|actor)\s+\w+"),
    p("observation_registration", r"\.observe\s*\(|\.register\s*\(|\.unregister\s*\("),
    p("observation_triggers", r"(?:objectWillChange|willSet|didSet|objectDidChange)\.send\s*\("),
    p("state_flow", r"\.onChange\s*\(\s*of:\s*[\w\$\.]+\s*\)\s*\{[^}]+\}"),
    p("state_dependencies", r"\.animation\s*\([^)]*,\s*value:\s*[\w\$\.]+\)"),
    p("state_propagation", r"\.propagateState\s*\(|\.updateState\s*\(|\.refreshState\s*\("),
    p("rcp_state_bindings", r"@Binding\s+var\s+\w+\s*:\s*(?:Entity|Material|Component)"),
    p("rcp_state_updates", r"\.update\s*\(\s*state:\s*[\w\$\.]+\s*\)"),
    p("rcp_state_sync", r"\.syncState\s*\(|\.bindState\s*\(|\.linkState\s*\("),
    p("state_persistence", r"@SceneStorage|@AppStorage|@UserDefault"),
    p("persistence_access", r"UserDefaults\.|SceneStorage\.|AppStorage\."),
    p("persistence_updates", r"(?:save|load|update|refresh)State\s*\("),
];

const BINDING: &[PatternDef] = &[
    p("swiftui_bindings", r"@Binding\s+(?:private\s+)?var\s+\w+"),
    p("binding_creation", r"Binding\s*\(\s*get:\s*\{[^}]+\},\s*set:\s*\{[^}]+\}\)"),
    p("binding_updates", r"(?:\$\w+|\w+\.binding)\s*=\s*"),
    p("rcp_bindings", r"@Binding\s+var\s+\w+\s*:\s*(?:Entity|Material|Component|Transform)"),
    p("rcp_binding_updates", r#"\.bind\s*\(\s*["']\w+["']\s*,\s*to:"#),
    p("rcp_binding_sync", r"\.syncBinding\s*\(|\.bindComponent\s*\(|\.linkBinding\s*\("),
    p("binding_chains", r"\.bind\s*\([^)]*\)\.bind\s*\("),
    p("binding_transforms", r"\.bind\s*\([^)]*\)\s*\{[^}]*transform:"),
    p("binding_conditions", r"\.bind\s*\([^)]*\)\s*\{[^}]*condition:"),
];

const STATE_FLOW: &[PatternDef] = &[
    p("state_handlers", r"\.onChange\s*\(\s*of:\s*[\w\$\.]+\s*\)\s*\{[^}]+\}"),
    p("state_watchers", r"\.onReceive\s*\([^)]+\)\s*\{[^}]+\}"),
    p("state_effects", r"\.task\s*\([^)]*\)\s*\{[^}]*\$[\w\.]+[^}]+\}"),
    p(
        "rcp_state_handlers",
        r"\.onUpdate\s*\([^)]*\)\s*\{[^}]*(?:entity|material|component)[^}]+\}",
    ),
    p(
        "rcp_state_updates",
        r"(?:entity|material|component)\.(?:update|modify|configure)\s*\([^)]*state:",
    ),
    p("rcp_state_sync", r"\.sync(?:State|Properties|Configuration)\s*\([^)]*\)"),
    p("component_state_updates", r"components\.(?:set|update|modify)\s*\([^)]*\)"),
    p("component_state_sync", r"\.syncComponent\s*\([^)]*\)"),
    p("component_state_flow", r"\.componentDidUpdate\s*\{[^}]+\}"),
    p(
        "material_state_updates",
        r"material\.(?:set|update|modify)(?:Parameter|Property)\s*\([^)]*\)",
    ),
    p("material_state_sync", r"\.syncMaterial\s*\([^)]*\)"),
    p("material_state_flow", r"\.materialDidUpdate\s*\{[^}]+\}"),
    p(
        "entity_state_updates",
        r"entity\.(?:set|update|modify)(?:Component|Property|State)\s*\([^)]*\)",
    ),
    p("entity_state_sync", r"\.syncEntity\s*\([^)]*\)"),
    p("entity_state_flow", r"\.entityDidUpdate\s*\{[^}]+\}"),
    p("binding_flow", r"Binding\s*\(\s*get:\s*\{[^}]+\$[\w\.]+[^}]+\},\s*set:"),
    guarded("binding_updates", r"(?:\$\w+|\w+\.binding)\s*=\s*"),
    p("binding_transforms", r"\.map\s*\{[^}]*\$[\w\.]+[^}]+\}"),
    guarded("state_propagation", r"(?:self\.)?(\w+)\s*=\s*"),
    p(
        "state_mutations",
        r"(?:mutating\s+)?func\s+\w+\s*\([^)]*\)\s*\{[^}]*(?:self\.)?[\w\.]+\s*=",
    ),
    p("state_transactions", r"withTransaction|withAnimation|withMutation"),
    p("observation_registration", r"\.observe\s*\(|\.register\s*\(|\.unregister\s*\("),
    p("observation_triggers", r"(?:objectWillChange|willSet|didSet|objectDidChange)\.send\s*\("),
    p("observation_flow", r"\.observationRegistrar\s*\{[^}]+\}"),
    p("environment_values", r"@Environment\(\\\.\w+\)\s+(?:private\s+)?var\s+\w+"),
    p("environment_updates", r"\.environment\(\s*\\\.[\w.]+\s*,\s*[\w.]+\)"),
    p("environment_flow", r"\.environmentObject\s*\([^)]+\)"),
];

const COMPONENT: &[PatternDef] = &[
    p(
        "component_definitions",
        r"(?:struct|class)\s+\w+(?:Component|State)\s*:\s*(?:Component|Codable)",
    ),
    p(
        "component_properties",
        r"(?:public|private)\s+var\s+\w+\s*:\s*(?:Entity|Bool|SIMD3|Transform)",
    ),
    p(
        "component_methods",
        r"(?:mutating\s+)?func\s+on(?:Changed|Ended)\s*\(\s*value:\s*EntityTargetValue<[^>]+>",
    ),
    p(
        "component_state",
        r"@MainActor\s+(?:final\s+)?(?:class|struct)\s+\w+State\s*:\s*Sendable",
    ),
];

const REALITYKIT_CONTENT: &[PatternDef] = &[
    p("system_components", r"(?:struct|class)\s+\w+System\s*:\s*System"),
    p(
        "gesture_components",
        r"(?:struct|class)\s+\w+GestureComponent\s*:\s*(?:Component|GestureComponent)",
    ),
    p(
        "input_components",
        r"(?:struct|class)\s+\w+InputComponent\s*:\s*(?:Component|InputComponent)",
    ),
    p(
        "event_handlers",
        r"func\s+on(?:Changed|Ended)\s*\(\s*value:\s*EntityTargetValue<[^>]+>",
    ),
];

pub static UI_PATTERNS: Lazy<PatternFamily> = Lazy::new(|| PatternFamily::compile("ui", UI));
pub static STATE_PATTERNS: Lazy<PatternFamily> = Lazy::new(|| PatternFamily::compile("state", STATE));
pub static LIFECYCLE_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("lifecycle", LIFECYCLE));
pub static UPDATE_PATTERNS: Lazy<PatternFamily> = Lazy::new(|| PatternFamily::compile("update", UPDATE));
pub static REALITY_COMPOSER_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("rcp", REALITY_COMPOSER));
pub static RCP_RELATIONSHIP_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("rcp_relationships", RCP_RELATIONSHIPS));
pub static SCENE_MODIFICATION_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("scene", SCENE_MODIFICATION));
pub static STATE_MANAGEMENT_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("state_management", STATE_MANAGEMENT));
pub static BINDING_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("binding", BINDING));
pub static STATE_FLOW_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("state_flow", STATE_FLOW));
pub static COMPONENT_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("component", COMPONENT));
pub static REALITYKIT_CONTENT_PATTERNS: Lazy<PatternFamily> =
    Lazy::new(|| PatternFamily::compile("realitykit_content", REALITYKIT_CONTENT));

/// Every family, for listing and for forcing compilation up front.
pub fn families() -> [&'static PatternFamily; 12] {
    [
        &UI_PATTERNS,
        &STATE_PATTERNS,
        &LIFECYCLE_PATTERNS,
        &UPDATE_PATTERNS,
        &REALITY_COMPOSER_PATTERNS,
        &RCP_RELATIONSHIP_PATTERNS,
        &SCENE_MODIFICATION_PATTERNS,
        &STATE_MANAGEMENT_PATTERNS,
        &BINDING_PATTERNS,
        &STATE_FLOW_PATTERNS,
        &COMPONENT_PATTERNS,
        &REALITYKIT_CONTENT_PATTERNS,
    ]
}
